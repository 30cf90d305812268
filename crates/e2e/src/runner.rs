//! Scenario runner: one fresh browser session per scenario, results as JSON

use std::path::{Path, PathBuf};
use std::time::Instant;
use serde::{Deserialize, Serialize};
use tracing::{info, error, debug};

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::fixture::Fixture;
use crate::scenario::Scenario;
use crate::session::{Screenshot, Session};

/// Outcome of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub screenshot: Option<Screenshot>,
    pub error: Option<String>,
}

impl TestResult {
    fn aborted(name: &str, error: &E2eError) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms: 0,
            steps: vec![],
            screenshot: None,
            error: Some(error.to_string()),
        }
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, result: TestResult) {
        self.total += 1;
        if result.success {
            self.passed += 1;
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            self.failed += 1;
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        self.results.push(result);
    }
}

/// Runs scenarios against a prepared fixture
pub struct TestRunner<'f> {
    fixture: &'f Fixture,
}

impl<'f> TestRunner<'f> {
    pub fn new(fixture: &'f Fixture) -> Self {
        Self { fixture }
    }

    /// Run every scenario under `dir`; finding none is an error
    pub async fn run_dir(&self, dir: &Path) -> E2eResult<TestSuiteResult> {
        let scenarios = Scenario::load_all(dir)?;
        if scenarios.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "no scenarios found in {}",
                dir.display()
            )));
        }
        Ok(self.run_scenarios(&scenarios).await)
    }

    /// Run scenarios tagged `tag` under `dir`; matching none is an error
    pub async fn run_tagged(&self, dir: &Path, tag: &str) -> E2eResult<TestSuiteResult> {
        let scenarios = Scenario::load_all(dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        if filtered.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "no scenarios tagged `{}` in {}",
                tag,
                dir.display()
            )));
        }
        Ok(self.run_scenarios(&filtered).await)
    }

    /// Run the scenario called `name` under `dir`
    pub async fn run_named(&self, dir: &Path, name: &str) -> E2eResult<TestSuiteResult> {
        let scenario = Scenario::load_all(dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        Ok(self.run_scenarios(std::slice::from_ref(&scenario)).await)
    }

    /// Run scenarios in order, each in its own browser session
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> TestSuiteResult {
        let start = Instant::now();
        let mut suite = TestSuiteResult::default();

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = match self.fixture.open_session().await {
                Ok(session) => self.run_in(session, scenario).await,
                Err(e) => TestResult::aborted(&scenario.name, &e),
            };
            suite.record(result);
        }

        suite.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        suite
    }

    /// Run one scenario on an open session; stops at the first failing step
    pub async fn run_in<D: Driver>(&self, mut session: Session<D>, scenario: &Scenario) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut steps = Vec::new();
        let mut failure: Option<String> = None;

        for step in &scenario.steps {
            let step_start = Instant::now();
            let outcome = step.execute(&mut session, self.fixture.artifact_dir()).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => steps.push(StepResult {
                    success: true,
                    step_name: step.label(),
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    let message = format!("{}: {}", step.label(), e);
                    steps.push(StepResult {
                        success: false,
                        step_name: step.label(),
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    failure = Some(message);
                    break;
                }
            }
        }

        let screenshot = match self
            .fixture
            .finish(&mut session, &scenario.name, failure.is_some())
            .await
        {
            Ok(shot) => shot,
            Err(e) => {
                failure.get_or_insert_with(|| format!("teardown: {}", e));
                None
            }
        };

        TestResult {
            name: scenario.name.clone(),
            success: failure.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            screenshot,
            error: failure,
        }
    }

    /// Write results to `test-results.json` in the artifact directory
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(self.fixture.artifact_dir(), results)
    }
}

pub fn write_results(dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

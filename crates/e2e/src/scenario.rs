//! Declarative YAML scenarios
//!
//! A scenario is a named list of steps written in the same vocabulary as the
//! session shortcuts, so simple flows need no Rust:
//!
//! ```yaml
//! name: favorites-screen
//! tags: [smoke]
//! steps:
//!   - action: login_and_go_to
//!     screen: favorites
//!   - action: assert_seen
//!     selector: "#favoritesWrapper"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};
use crate::session::Session;

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Log in, with the seeded admin unless credentials are given
    Login {
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// Log in as the admin and wait for the user badge
    LoginAndWait,

    /// Open a screen from the sidebar
    Goto { screen: String },

    LoginAndGoTo { screen: String },

    Click { selector: String },

    TypeIn { selector: String, text: String },

    /// Press Enter on the focused element
    Enter,

    FocusApp,

    /// Wait for an element to appear
    Wait {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for text inside an element
    WaitText {
        selector: String,
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Element must be present right now
    AssertSeen { selector: String },

    /// Element must be absent right now
    AssertNotSeen { selector: String },

    Screenshot { name: String },

    /// Fixed delay (use sparingly)
    Sleep { ms: u64 },

    Log { message: String },
}

impl Step {
    /// Short label used in logs and results
    pub fn label(&self) -> String {
        match self {
            Step::Login { username, .. } => {
                format!("login:{}", username.as_deref().unwrap_or("default"))
            }
            Step::LoginAndWait => "login_and_wait".to_string(),
            Step::Goto { screen } => format!("goto:{}", screen),
            Step::LoginAndGoTo { screen } => format!("login_and_go_to:{}", screen),
            Step::Click { selector } => format!("click:{}", selector),
            Step::TypeIn { selector, .. } => format!("type_in:{}", selector),
            Step::Enter => "enter".to_string(),
            Step::FocusApp => "focus_app".to_string(),
            Step::Wait { selector, .. } => format!("wait:{}", selector),
            Step::WaitText { selector, text, .. } => format!("wait_text:{}:{}", selector, text),
            Step::AssertSeen { selector } => format!("assert_seen:{}", selector),
            Step::AssertNotSeen { selector } => format!("assert_not_seen:{}", selector),
            Step::Screenshot { name } => format!("screenshot:{}", name),
            Step::Sleep { ms } => format!("sleep:{}ms", ms),
            Step::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
        }
    }

    /// Run this step on a session. Screenshots land in `artifact_dir`.
    pub async fn execute<D: Driver>(
        &self,
        session: &mut Session<D>,
        artifact_dir: &Path,
    ) -> E2eResult<()> {
        match self {
            Step::Login { username, password } => {
                match (username, password) {
                    (None, None) => session.login().await?,
                    (u, p) => {
                        session
                            .login_as(
                                u.as_deref().unwrap_or(crate::session::DEFAULT_USERNAME),
                                p.as_deref().unwrap_or(crate::session::DEFAULT_PASSWORD),
                            )
                            .await?
                    }
                };
            }
            Step::LoginAndWait => {
                session.login_and_wait().await?;
            }
            Step::Goto { screen } => {
                session.goto(screen).await?;
            }
            Step::LoginAndGoTo { screen } => {
                session.login_and_go_to(screen).await?;
            }
            Step::Click { selector } => {
                session.click(selector).await?;
            }
            Step::TypeIn { selector, text } => {
                session.type_in(selector, text).await?;
            }
            Step::Enter => {
                session.enter().await?;
            }
            Step::FocusApp => {
                session.focus_into_app().await?;
            }
            Step::Wait {
                selector,
                timeout_ms,
            } => {
                let waiter = with_timeout(session, *timeout_ms);
                waiter.until_seen(session.driver(), selector).await?;
            }
            Step::WaitText {
                selector,
                text,
                timeout_ms,
            } => {
                let waiter = with_timeout(session, *timeout_ms);
                waiter
                    .until_text_seen_in(session.driver(), text, selector)
                    .await?;
            }
            Step::AssertSeen { selector } => {
                if !session.see(selector).await? {
                    return Err(E2eError::AssertionFailed(format!(
                        "expected `{}` to be present",
                        selector
                    )));
                }
            }
            Step::AssertNotSeen { selector } => {
                if session.see(selector).await? {
                    return Err(E2eError::AssertionFailed(format!(
                        "expected `{}` to be absent",
                        selector
                    )));
                }
            }
            Step::Screenshot { name } => {
                session.screenshot(artifact_dir, name).await?;
            }
            Step::Sleep { ms } => {
                session.pause(Duration::from_millis(*ms)).await?;
            }
            Step::Log { message } => {
                info!("[SCENARIO] {}", message);
            }
        }
        Ok(())
    }
}

fn with_timeout<D: Driver>(session: &Session<D>, timeout_ms: Option<u64>) -> crate::wait::Waiter {
    match timeout_ms {
        Some(ms) => session.waiter().with_timeout(Duration::from_millis(ms)),
        None => session.waiter(),
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!(
                "scenario `{}` has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios under a directory, sorted by file path.
    /// A missing or unreadable directory is an error, not an empty list.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry
                .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", dir.display(), e)))?;
            let is_yaml = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if is_yaml {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }
}

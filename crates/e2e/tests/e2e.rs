//! E2E test harness entry point
//!
//! Runs the YAML scenarios against a live browser and app.
//! Run with: cargo test --package koel-e2e --test e2e -- --scenarios <dir>
//!
//! When no WebDriver endpoint answers, the run is skipped rather than failed.

use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

use koel_e2e::server::wait_for_http;
use koel_e2e::{Browser, E2eResult, Fixture, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "koel-e2e")]
#[command(about = "E2E test runner for Koel")]
struct Args {
    /// Path to scenario directory
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/e2e/scenarios"))]
    scenarios: PathBuf,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Harness config file
    #[arg(short, long, env = "KOEL_E2E_CONFIG", default_value = "koel-e2e.toml")]
    config: PathBuf,

    /// WebDriver endpoint
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Base URL of the app under test
    #[arg(long)]
    app_url: Option<String>,

    /// Browser to use (chrome, firefox, edge)
    #[arg(long)]
    browser: Option<String>,

    /// Run in headless mode
    #[arg(long)]
    headless: bool,

    /// Output directory for screenshots and results
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    koel_e2e::init_logging();

    // cargo test passes harness flags like --nocapture; keep only ours
    let args = Args::parse_from(
        std::env::args().filter(|a| !matches!(a.as_str(), "--nocapture" | "--quiet" | "-q")),
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let mut config = koel_e2e::HarnessConfig::load(&args.config)?.apply_env()?;
    if let Some(url) = args.webdriver_url {
        config.webdriver_url = url;
    }
    if let Some(url) = args.app_url {
        config.app_url = url;
    }
    if let Some(browser) = args.browser {
        config.browser = browser.parse::<Browser>()?;
    }
    if args.headless {
        config.headless = true;
    }
    if let Some(output) = args.output {
        config.artifact_dir = output;
    }

    let status_url = format!("{}/status", config.webdriver_url.trim_end_matches('/'));
    if wait_for_http(&status_url, Duration::from_secs(2)).await.is_err() {
        println!("Skipping: no WebDriver endpoint at {}", config.webdriver_url);
        return Ok(true);
    }

    let fixture = Fixture::new(config).await?;
    let runner = TestRunner::new(&fixture);

    let results = if let Some(name) = args.name {
        runner.run_named(&args.scenarios, &name).await?
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&args.scenarios, &tag).await?
    } else {
        runner.run_dir(&args.scenarios).await?
    };

    runner.write_results(&results)?;

    Ok(results.success())
}

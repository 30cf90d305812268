//! Koel E2E Test Framework
//!
//! Browser end-to-end tests for Koel, driven from Rust over WebDriver:
//! - Rebuilds a throwaway SQLite database (migrate, seed, E2E seed) per run
//! - Opens one browser session per test and tears it down afterwards
//! - Offers Koel-level shortcuts (`login`, `goto`, `login_and_go_to`, ...)
//! - Runs declarative YAML scenarios written in the same vocabulary
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Koel E2E Harness (Rust)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Fixture                                                    │
//! │    ├── new(config)        bootstrap app, rebuild database   │
//! │    ├── open_session()     setUp: new browser, load app      │
//! │    ├── finish()           tearDown: screenshot, quit        │
//! │    └── run(name, test)    setUp + test + tearDown           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session<D: Driver>                                         │
//! │    ├── login / login_as / login_and_wait                    │
//! │    ├── goto(screen) / login_and_go_to(screen)               │
//! │    ├── focus_into_app / wait_for_user_input                 │
//! │    └── wait_until_seen / _gone / _text_seen_in              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    └── Scenario (YAML) -> TestResult -> test-results.json   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod session;
pub mod wait;

pub use config::{HarnessConfig, WaitConfig};
pub use driver::{Browser, Driver, RemoteDriver};
pub use error::{E2eError, E2eResult};
pub use fixture::Fixture;
pub use runner::{TestResult, TestRunner, TestSuiteResult};
pub use scenario::{Scenario, Step};
pub use session::{Screenshot, Session};
pub use wait::{Condition, Waiter};

use tracing_subscriber::{fmt, EnvFilter};

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call from every test; only the first call wins.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

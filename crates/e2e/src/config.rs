//! Harness configuration
//!
//! Defaults are the fixed local addresses the Koel E2E setup has always used
//! (Selenium on :4444, `php artisan serve --port=8081`). A TOML file and
//! `KOEL_E2E_*` environment variables can override them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use koel_app::AppConfig;

use crate::driver::Browser;
use crate::error::{E2eError, E2eResult};
use crate::server::ServerConfig;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444/wd/hub";
pub const DEFAULT_APP_URL: &str = "http://localhost:8081";

/// Bounded polling used by every "wait until" helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub timeout_ms: u64,
    pub interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            interval_ms: 250,
        }
    }
}

impl WaitConfig {
    /// Rejects a zero poll interval
    pub fn validate(&self) -> E2eResult<()> {
        if self.interval_ms == 0 {
            return Err(E2eError::Config("wait.interval_ms must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Everything the fixture needs to stand up a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Remote WebDriver endpoint
    pub webdriver_url: String,

    /// Base URL of the app under test
    pub app_url: String,

    /// Browser requested from the WebDriver endpoint
    pub browser: Browser,

    /// Ask the browser to run without a window
    pub headless: bool,

    /// In-process bootstrap settings (app root, fixture database, kernel)
    pub app: AppConfig,

    /// Where screenshots and result files go
    pub artifact_dir: PathBuf,

    pub wait: WaitConfig,

    /// Spawn `php artisan serve` instead of expecting the app to be up
    pub server: Option<ServerConfig>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            browser: Browser::Chrome,
            headless: false,
            app: AppConfig::default(),
            artifact_dir: PathBuf::from("test-results"),
            wait: WaitConfig::default(),
            server: None,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.wait.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `KOEL_E2E_*` overrides from the process environment
    pub fn apply_env(self) -> E2eResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(mut self, lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KOEL_E2E_WEBDRIVER_URL") {
            self.webdriver_url = v;
        }
        if let Some(v) = lookup("KOEL_E2E_APP_URL") {
            self.app_url = v;
        }
        if let Some(v) = lookup("KOEL_E2E_BROWSER") {
            self.browser = v.parse()?;
        }
        if let Some(v) = lookup("KOEL_E2E_HEADLESS") {
            self.headless = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("KOEL_E2E_APP_ROOT") {
            self.app.root = PathBuf::from(v);
        }
        if let Some(v) = lookup("KOEL_E2E_DATABASE") {
            self.app.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("KOEL_E2E_KERNEL") {
            self.app.kernel = v
                .parse()
                .map_err(|e: koel_app::Error| E2eError::Config(e.to_string()))?;
        }
        if let Some(v) = lookup("KOEL_E2E_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("KOEL_E2E_WAIT_TIMEOUT_MS") {
            self.wait.timeout_ms = v
                .parse()
                .map_err(|_| E2eError::Config(format!("KOEL_E2E_WAIT_TIMEOUT_MS: not a number: {}", v)))?;
        }
        if let Some(v) = lookup("KOEL_E2E_WAIT_INTERVAL_MS") {
            self.wait.interval_ms = v
                .parse()
                .map_err(|_| E2eError::Config(format!("KOEL_E2E_WAIT_INTERVAL_MS: not a number: {}", v)))?;
        }
        self.wait.validate()?;
        Ok(self)
    }
}

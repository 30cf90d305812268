//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Application bootstrap failed: {0}")]
    Bootstrap(#[from] koel_app::Error),

    #[error("Could not open browser session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("Browser session already closed")]
    SessionClosed,

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timeout after {waited_ms} ms waiting for {condition} in `{selector}`")]
    Timeout {
        condition: String,
        selector: String,
        waited_ms: u64,
    },

    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether this is a bounded wait that ran out
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

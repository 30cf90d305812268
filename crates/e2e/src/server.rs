//! App server management - spawning `php artisan serve` and health checking it
//!
//! Optional: by default the harness expects Koel to already be served on the
//! configured URL. When a [`ServerConfig`] is given the fixture starts the
//! server itself and stops it when the fixture is dropped.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    pub base_url: String,
    pub port: u16,
}

impl ServerHandle {
    /// Spawn `php artisan serve` from the application root
    pub async fn spawn(config: &ServerConfig, app_root: &Path, db_connection: &str) -> E2eResult<Self> {
        let base_url = format!("http://{}:{}", config.host, config.port);

        info!("Spawning app server on port {}", config.port);

        let mut cmd = Command::new(&config.php_binary);
        cmd.args(config.args())
            .current_dir(app_root)
            .env("DB_CONNECTION", db_connection)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!(
                "Failed to spawn {}: {}",
                config.php_binary.display(),
                e
            ))
        })?;

        // `artisan serve` logs every request to stderr; an undrained pipe stalls it
        if let Some(stderr) = child.stderr.take() {
            forward_stderr(stderr);
        }

        let handle = ServerHandle {
            child,
            base_url: base_url.clone(),
            port: config.port,
        };

        // Dropping the handle on failure kills the child
        handle
            .wait_for_healthy(Duration::from_secs(config.startup_timeout_secs))
            .await?;

        info!("Server is healthy at {}", base_url);
        Ok(handle)
    }

    /// Poll the base URL until it answers
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        wait_for_http(&self.base_url, timeout_duration).await
    }

    /// Get the base URL for this server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        info!("Stopping server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn forward_stderr(stderr: ChildStderr) {
    std::thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            debug!(target: "artisan_serve", "{}", line);
        }
    });
}

/// Poll `url` until it returns a non-server-error response or `timeout_duration` passes
pub async fn wait_for_http(url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = std::time::Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if !resp.status().is_server_error() => {
                return Ok(());
            }
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to come up...", url);
                }
                // Connection refused is expected while the server is starting
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        if start.elapsed() >= timeout_duration {
            return Err(E2eError::ServerHealthCheck(attempts));
        }
        sleep(Duration::from_millis(100)).await;
    }
}

/// Configuration for spawning the app server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// PHP interpreter
    pub php_binary: PathBuf,

    pub host: String,

    pub port: u16,

    /// Seconds to wait for the first successful response
    pub startup_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            php_binary: PathBuf::from("php"),
            host: "localhost".to_string(),
            port: 8081,
            startup_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn args(&self) -> Vec<String> {
        vec![
            "artisan".to_string(),
            "serve".to_string(),
            format!("--host={}", self.host),
            format!("--port={}", self.port),
        ]
    }
}

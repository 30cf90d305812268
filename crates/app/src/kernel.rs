//! Console kernels: the `migrate` / `db:seed` command runner
//!
//! The fixture only ever talks to [`ConsoleKernel::call`], the same way the
//! application's own tooling is driven by command name plus options.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::db::Database;
use crate::migrations::Migrator;
use crate::seeders::{self, DEFAULT_SEEDER};
use crate::{Error, Result};

/// Runs console commands by name, e.g. `call("db:seed", &[("--class", "E2EDataSeeder")])`
pub trait ConsoleKernel: Send + Sync {
    fn call(&self, command: &str, options: &[(&str, &str)]) -> Result<()>;
}

fn option<'a>(options: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
    options.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

/// In-process kernel backed by the embedded migrations and seeders
pub struct EmbeddedKernel {
    database: PathBuf,
}

impl EmbeddedKernel {
    pub fn new(database: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

impl ConsoleKernel for EmbeddedKernel {
    fn call(&self, command: &str, options: &[(&str, &str)]) -> Result<()> {
        debug!("kernel: {} {:?}", command, options);
        let db = Database::open(&self.database)?;

        match command {
            "migrate" => {
                Migrator::new(&db).run()?;
                Ok(())
            }
            "db:seed" => {
                let class = option(options, "--class").unwrap_or(DEFAULT_SEEDER);
                let seeder = seeders::find(class)?;
                seeders::seed(&db, seeder.as_ref())
            }
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// Kernel that shells out to `php artisan` in the application checkout
pub struct ArtisanKernel {
    root: PathBuf,
    php: PathBuf,
    db_connection: String,
}

impl ArtisanKernel {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            root: config.root.clone(),
            php: config.php_binary.clone(),
            db_connection: config.db_connection.clone(),
        }
    }

    /// Full argument list for an artisan invocation
    pub fn args(command: &str, options: &[(&str, &str)]) -> Vec<String> {
        let mut args = vec!["artisan".to_string(), command.to_string()];
        for (name, value) in options {
            if value.is_empty() {
                args.push(name.to_string());
            } else {
                args.push(format!("{}={}", name, value));
            }
        }
        args.push("--force".to_string());
        args.push("--no-interaction".to_string());
        args
    }
}

impl ConsoleKernel for ArtisanKernel {
    fn call(&self, command: &str, options: &[(&str, &str)]) -> Result<()> {
        let args = Self::args(command, options);
        info!("Running php {}", args.join(" "));

        let output = Command::new(&self.php)
            .args(&args)
            .current_dir(&self.root)
            .env("DB_CONNECTION", &self.db_connection)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::Command {
                command: command.to_string(),
                reason: format!("failed to spawn {}: {}", self.php.display(), e),
            })?;

        if !output.status.success() {
            return Err(Error::Command {
                command: command.to_string(),
                reason: format!(
                    "exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}

//! Koel application bootstrap for end-to-end runs
//!
//! Owns everything the browser tests need on the server side before a
//! session is opened: the fixture database file, its schema, its seed data,
//! and the console kernel that produces them.

pub mod config;
pub mod db;
pub mod error;
pub mod kernel;
pub mod migrations;
pub mod seeders;

pub use config::{AppConfig, KernelMode};
pub use db::Database;
pub use error::{Error, Result};
pub use kernel::{ArtisanKernel, ConsoleKernel, EmbeddedKernel};

use std::path::{Path, PathBuf};
use tracing::info;

/// The bootstrapped application: configuration plus a console kernel
pub struct Application {
    config: AppConfig,
    kernel: Box<dyn ConsoleKernel>,
}

impl Application {
    /// Build the container and pick the kernel the config asks for
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        if !config.root.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "application root {} is not a directory",
                config.root.display()
            )));
        }

        let kernel: Box<dyn ConsoleKernel> = match config.kernel {
            KernelMode::Embedded => Box::new(EmbeddedKernel::new(config.database_path())),
            KernelMode::Artisan => Box::new(ArtisanKernel::new(&config)),
        };

        info!(
            "Bootstrapped application at {} ({:?} kernel)",
            config.root.display(),
            config.kernel
        );
        Ok(Self { config, kernel })
    }

    /// Bootstrap with a caller-supplied kernel
    pub fn with_kernel(config: AppConfig, kernel: Box<dyn ConsoleKernel>) -> Self {
        Self { config, kernel }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database_path()
    }

    /// Run a console command through the kernel
    pub fn call(&self, command: &str, options: &[(&str, &str)]) -> Result<()> {
        self.kernel.call(command, options)
    }

    /// Delete and recreate the fixture database, then migrate and seed it
    /// (default seed, then the E2E seed on top).
    pub fn prepare_database(&self) -> Result<Database> {
        let path = self.database_path();
        Database::recreate(&path)?;

        self.call("migrate", &[])?;
        self.call("db:seed", &[])?;
        self.call("db:seed", &[("--class", "E2EDataSeeder")])?;

        Database::open(&path)
    }
}

//! Application bootstrap configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Which console kernel executes `migrate` and `db:seed`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelMode {
    /// Migrations and seeders compiled into this crate, run against SQLite directly
    #[default]
    Embedded,
    /// Delegate to `php artisan` inside the application checkout
    Artisan,
}

impl std::str::FromStr for KernelMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "embedded" => Ok(KernelMode::Embedded),
            "artisan" => Ok(KernelMode::Artisan),
            other => Err(Error::InvalidConfig(format!("unknown kernel mode: {}", other))),
        }
    }
}

/// Bootstrap configuration for the application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the application checkout
    pub root: PathBuf,

    /// Fixture database file, relative to `root` unless absolute
    pub database: PathBuf,

    /// Kernel used for console commands
    pub kernel: KernelMode,

    /// PHP interpreter for the artisan kernel
    pub php_binary: PathBuf,

    /// Value of `DB_CONNECTION` handed to artisan
    pub db_connection: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            database: PathBuf::from("database/e2e.sqlite"),
            kernel: KernelMode::Embedded,
            php_binary: PathBuf::from("php"),
            db_connection: "sqlite-e2e".to_string(),
        }
    }
}

impl AppConfig {
    /// Config rooted at the given application checkout
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Absolute-or-rooted path of the fixture database
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.root.join(&self.database)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_is_rooted() {
        let config = AppConfig::rooted_at("/srv/koel");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/srv/koel/database/e2e.sqlite")
        );
    }

    #[test]
    fn test_absolute_database_path_wins() {
        let config = AppConfig {
            database: PathBuf::from("/tmp/e2e.sqlite"),
            ..AppConfig::rooted_at("/srv/koel")
        };
        assert_eq!(config.database_path(), PathBuf::from("/tmp/e2e.sqlite"));
    }

    #[test]
    fn test_kernel_mode_parse() {
        assert_eq!("artisan".parse::<KernelMode>().unwrap(), KernelMode::Artisan);
        assert!("laravel".parse::<KernelMode>().is_err());
    }
}

//! Error types for the in-process Koel bootstrap

use thiserror::Error;

/// Result type alias using the bootstrap Error
pub type Result<T> = std::result::Result<T, Error>;

/// Bootstrap error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    #[error("Command `{0}` is not defined")]
    UnknownCommand(String),

    #[error("Seeder class `{0}` does not exist")]
    UnknownSeeder(String),

    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database URL error
    #[error(transparent)]
    Target(#[from] flowsweep_domain::TargetError),

    /// Retention policy error
    #[error(transparent)]
    Policy(#[from] flowsweep_domain::PolicyError),

    /// Schema model error
    #[error(transparent)]
    Schema(#[from] flowsweep_domain::SchemaError),

    /// Storage error
    #[error(transparent)]
    Store(#[from] flowsweep_store::StoreError),

    /// Backup error
    #[error(transparent)]
    Backup(#[from] flowsweep_backup::BackupError),

    /// Cleanup error
    #[error(transparent)]
    Janitor(#[from] flowsweep_janitor::JanitorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation the target database does not support
    #[error("Not supported: {0}")]
    Unsupported(String),
}

//! Error types for Janitor operations

use flowsweep_backup::BackupError;
use flowsweep_domain::{PolicyError, SchemaError, Timestamp};
use thiserror::Error;

/// Errors that can occur during Janitor operations
#[derive(Error, Debug)]
pub enum JanitorError {
    /// Retention policy could not be resolved
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Schema model has no valid deletion order
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Pre-cleanup backup failed; nothing was deleted
    #[error("Backup failed, cleanup aborted: {0}")]
    Backup(#[from] BackupError),

    /// A delete failed and the whole run was rolled back
    #[error("Deleting from '{table}' (cutoff {cutoff}) failed, all changes rolled back: {source}")]
    Deletion {
        /// Table whose delete failed
        table: String,
        /// Cutoff the run was using
        cutoff: Timestamp,
        /// Store error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

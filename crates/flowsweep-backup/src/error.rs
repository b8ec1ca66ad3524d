//! Error types for backup operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while creating, listing, pruning or restoring backups
#[derive(Error, Debug)]
pub enum BackupError {
    /// The database to back up cannot be reached (missing file, in-memory DB)
    #[error("Backup source unavailable: {0}")]
    SourceUnavailable(String),

    /// The backup destination cannot be created or written
    #[error("Backup destination not writable: {path}: {source}")]
    NotWritable {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The dump or restore utility failed
    #[error("{program} failed ({status}): {stderr}")]
    DumpFailed {
        /// Program that was run
        program: String,
        /// Exit status or spawn failure
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The artifact does not look like a complete backup
    #[error("Backup verification failed: {0}")]
    Verification(String),

    /// No backup with the given name
    #[error("Backup not found: {0}")]
    NotFound(String),

    /// Invalid parameter (negative keep count, bad backup name)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// SQLite failed while copying pages to or from an artifact
    #[error("SQLite backup error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

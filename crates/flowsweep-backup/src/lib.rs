//! flowsweep Backups
//!
//! Snapshots a Prefect database before cleanup and manages the resulting
//! artifacts.
//!
//! # Architecture
//!
//! - [`BackupStrategy`]: engine-specific snapshot and restore. SQLite goes
//!   through the online backup API ([`FileSnapshot`]); PostgreSQL goes through
//!   `pg_dump`/`psql` ([`DumpRestore`])
//! - [`BackupHandler`]: naming, listing, pruning and restoring artifacts in a
//!   backup directory
//!
//! Artifacts are written to `<name>.backup.tmp` and renamed into place, so a
//! failed backup never leaves a truncated file under a real backup name.

#![warn(missing_docs)]

mod config;
mod error;
mod handler;
mod strategy;

pub use config::BackupConfig;
pub use error::BackupError;
pub use handler::{BackupHandler, BACKUP_EXTENSION};
pub use strategy::{strategy_for, BackupStrategy, DumpRestore, FileSnapshot};

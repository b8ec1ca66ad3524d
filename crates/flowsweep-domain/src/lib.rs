//! flowsweep Domain Layer
//!
//! Core model for retention-based cleanup of a workflow-orchestration
//! metadata database. This crate performs no I/O: it defines the concepts,
//! value objects and trait interfaces that the store, backup, janitor and
//! CLI crates build on.
//!
//! ## Key Concepts
//!
//! - **Schema model**: tables, their timestamp column and foreign-key edges
//! - **Deletion order**: dependents before the rows they reference
//! - **Retention policy**: a preset or day count resolved to one cutoff
//! - **Cleanup report**: per-table deleted counts for one run
//! - **Backup record**: a timestamped snapshot artifact
//! - **Database target**: which engine a URL points at, and how it is backed up
//!
//! ## Architecture
//!
//! - No I/O, no runtime dependencies
//! - Trait definitions for every external interaction (see [`traits`])
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod report;
pub mod retention;
pub mod schema;
pub mod target;
pub mod traits;

// Re-exports for convenience
pub use error::{PolicyError, SchemaError, TargetError};
pub use report::{BackupRecord, CleanupReport, TableDeletion};
pub use retention::{RetentionPolicy, SECONDS_PER_DAY};
pub use schema::{SchemaModel, TableDescriptor};
pub use target::{BackupCapability, DatabaseTarget};
pub use traits::{PurgeStore, ReadStore};

/// Seconds since the Unix epoch
pub type Timestamp = u64;

//! flowsweep Janitor
//!
//! Retention cleanup for a Prefect metadata database.
//!
//! # Overview
//!
//! The Janitor is responsible for:
//! - **Monitoring**: row counts, size estimate and health of the database
//! - **Backup first**: a snapshot is taken before anything is deleted
//! - **Ordered cleanup**: rows older than the retention cutoff are deleted
//!   child tables first, so foreign keys hold at every step
//! - **Atomicity**: one transaction per run; any failure rolls back every table
//! - **Metrics collection**: tracking cleanup runs for monitoring
//!
//! # Usage
//!
//! ## One-time Cleanup
//!
//! ```no_run
//! use flowsweep_backup::{BackupConfig, BackupHandler};
//! use flowsweep_domain::{DatabaseTarget, RetentionPolicy};
//! use flowsweep_janitor::{Janitor, JanitorConfig};
//! use flowsweep_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let target = DatabaseTarget::parse("sqlite:///prefect.db")?;
//! let handler = BackupHandler::new(&target, BackupConfig::default())?;
//!
//! let mut store = SqliteStore::open("prefect.db")?;
//! let mut janitor = Janitor::prefect(JanitorConfig::default()).with_backup(handler);
//!
//! let report = janitor.run(&mut store, &RetentionPolicy::weekly(), true)?;
//! for deletion in report.deletions() {
//!     println!("{}: {}", deletion.table, deletion.rows);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Health Check
//!
//! ```no_run
//! use flowsweep_domain::SchemaModel;
//! use flowsweep_janitor::{Monitor, MonitorConfig};
//! use flowsweep_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::open_read_only("prefect.db")?;
//! let monitor = Monitor::new(MonitorConfig::default(), SchemaModel::prefect());
//!
//! let snapshot = monitor.snapshot(&store);
//! println!("{}: {}", monitor.health(&snapshot), Monitor::recommendation(snapshot.total_rows()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use flowsweep_janitor::JanitorConfig;
//!
//! // Default: keep 30 days, back up first
//! let config = JanitorConfig::default();
//!
//! // Aggressive: keep one week
//! let config = JanitorConfig::aggressive();
//!
//! // Lenient: keep one quarter
//! let config = JanitorConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! The Janitor can be configured via TOML:
//!
//! ```toml
//! [janitor]
//! retention = "monthly"
//! backup_before_cleanup = true
//! dry_run = false
//! sweep_interval_minutes = 1440
//! ```
//!
//! After a scheduled run that took a backup, the worker prunes the backup
//! directory down to the backup handler's `keep` count.

#![warn(missing_docs)]

mod config;
mod error;
mod janitor;
mod metrics;
mod monitor;
mod worker;

#[cfg(test)]
mod testing;

pub use config::JanitorConfig;
pub use error::JanitorError;
pub use janitor::Janitor;
pub use metrics::JanitorMetrics;
pub use monitor::{DatabaseSnapshot, HealthStatus, Monitor, MonitorConfig, TableCount};
pub use worker::JanitorWorker;

use flowsweep_domain::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current timestamp in seconds since Unix epoch
pub fn now_timestamp() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

//! Results produced by cleanup and backup operations

use crate::Timestamp;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Rows removed from one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDeletion {
    /// Table name
    pub table: String,
    /// Rows deleted (or that would be deleted, in a dry run)
    pub rows: u64,
}

/// Outcome of one cleanup run
///
/// Built by the janitor at the end of a run. Fields are read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupReport {
    cutoff: Timestamp,
    retention_days: u32,
    deletions: Vec<TableDeletion>,
    elapsed: Duration,
    dry_run: bool,
    backup: Option<BackupRecord>,
}

impl CleanupReport {
    /// Assemble a report; `deletions` must be in deletion order
    pub fn new(
        cutoff: Timestamp,
        retention_days: u32,
        deletions: Vec<TableDeletion>,
        elapsed: Duration,
        dry_run: bool,
        backup: Option<BackupRecord>,
    ) -> Self {
        Self {
            cutoff,
            retention_days,
            deletions,
            elapsed,
            dry_run,
            backup,
        }
    }

    /// Cutoff used for every table in the run
    pub fn cutoff(&self) -> Timestamp {
        self.cutoff
    }

    /// Retention window the cutoff was derived from
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    /// Per-table counts, in the order tables were purged
    pub fn deletions(&self) -> &[TableDeletion] {
        &self.deletions
    }

    /// Count for a single table (`None` if the table was not part of the run)
    pub fn deleted(&self, table: &str) -> Option<u64> {
        self.deletions.iter().find(|d| d.table == table).map(|d| d.rows)
    }

    /// Sum over all tables
    pub fn total_deleted(&self) -> u64 {
        self.deletions.iter().map(|d| d.rows).sum()
    }

    /// Wall-clock time of the run
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// True if nothing was deleted because the run only counted
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Backup taken before the run, if any
    pub fn backup(&self) -> Option<&BackupRecord> {
        self.backup.as_ref()
    }
}

/// A backup artifact on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Artifact name (file stem)
    pub name: String,
    /// Full path of the artifact
    pub path: PathBuf,
    /// Creation time
    pub created_at: SystemTime,
    /// Identity of the database that was backed up (credentials redacted)
    pub source: String,
    /// Artifact size in bytes
    pub size_bytes: u64,
}

impl BackupRecord {
    /// Path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in mebibytes, rounded to two decimals
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

//! Metrics collection for Janitor operations

use flowsweep_domain::CleanupReport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Metrics collected across Janitor runs
///
/// Tracks rows deleted per table, run and failure counts, and runtime.
/// Dry runs count as runs but add nothing to the deletion totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JanitorMetrics {
    /// Rows deleted per table
    pub deleted: BTreeMap<String, u64>,

    /// Completed runs (including dry runs)
    pub runs: usize,

    /// Runs that failed and were rolled back or aborted
    pub failures: usize,

    /// Backups taken before cleanup
    pub backups: usize,

    /// Total runtime of completed runs
    pub total_runtime: Duration,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a completed run into the totals
    pub fn record_run(&mut self, report: &CleanupReport) {
        self.runs += 1;
        self.total_runtime += report.elapsed();
        if report.backup().is_some() {
            self.backups += 1;
        }
        if report.is_dry_run() {
            return;
        }
        for deletion in report.deletions() {
            *self.deleted.entry(deletion.table.clone()).or_insert(0) += deletion.rows;
        }
    }

    /// Record a failed run
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Get total rows deleted across all tables
    pub fn total_deleted(&self) -> u64 {
        self.deleted.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Runs: {} ({} failed)", self.runs, self.failures),
            format!("Backups taken: {}", self.backups),
            format!("Total runtime: {:.1}s", self.total_runtime.as_secs_f64()),
        ];

        let nonzero: Vec<_> = self.deleted.iter().filter(|(_, rows)| **rows > 0).collect();
        if !nonzero.is_empty() {
            lines.push(String::new());
            lines.push("Deletions by table:".to_string());
            for (table, rows) in nonzero {
                lines.push(format!("  {}: {}", table, rows));
            }
            lines.push(format!("  Total: {}", self.total_deleted()));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowsweep_domain::{BackupRecord, TableDeletion};
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn report(rows: &[(&str, u64)], dry_run: bool, backup: bool) -> CleanupReport {
        let deletions = rows
            .iter()
            .map(|(table, rows)| TableDeletion {
                table: table.to_string(),
                rows: *rows,
            })
            .collect();
        let record = backup.then(|| BackupRecord {
            name: "b".to_string(),
            path: PathBuf::from("b.backup"),
            created_at: SystemTime::UNIX_EPOCH,
            source: "sqlite:///prefect.db".to_string(),
            size_bytes: 1,
        });
        CleanupReport::new(0, 30, deletions, Duration::from_millis(1500), dry_run, record)
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = JanitorMetrics::new();
        assert_eq!(metrics.total_deleted(), 0);
        assert_eq!(metrics.runs, 0);
        assert_eq!(metrics.failures, 0);
    }

    #[test]
    fn test_record_run_accumulates() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_run(&report(&[("log", 5), ("flow_run", 3)], false, true));
        metrics.record_run(&report(&[("log", 2)], false, false));

        assert_eq!(metrics.deleted["log"], 7);
        assert_eq!(metrics.deleted["flow_run"], 3);
        assert_eq!(metrics.total_deleted(), 10);
        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.backups, 1);
        assert_eq!(metrics.total_runtime, Duration::from_secs(3));
    }

    #[test]
    fn test_dry_run_counts_nothing_deleted() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_run(&report(&[("log", 50)], true, false));
        assert_eq!(metrics.runs, 1);
        assert_eq!(metrics.total_deleted(), 0);
    }

    #[test]
    fn test_reset() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_run(&report(&[("log", 10)], false, false));
        metrics.record_failure();

        metrics.reset();

        assert_eq!(metrics.total_deleted(), 0);
        assert_eq!(metrics.runs, 0);
        assert_eq!(metrics.failures, 0);
    }

    #[test]
    fn test_summary() {
        let mut metrics = JanitorMetrics::new();
        metrics.record_run(&report(&[("log", 5), ("events", 0)], false, true));
        metrics.record_failure();

        let summary = metrics.summary();
        assert!(summary.contains("Runs: 1 (1 failed)"));
        assert!(summary.contains("Backups taken: 1"));
        assert!(summary.contains("Total runtime: 1.5s"));
        assert!(summary.contains("log: 5"));
        assert!(!summary.contains("events"));
    }
}

//! Core Janitor implementation: backup-first, transactional retention cleanup

use crate::monitor::{Monitor, MonitorConfig};
use crate::{now_timestamp, JanitorConfig, JanitorError, JanitorMetrics};
use flowsweep_backup::BackupHandler;
use flowsweep_domain::{CleanupReport, PurgeStore, RetentionPolicy, SchemaModel, TableDeletion, Timestamp};
use std::time::Instant;

/// Janitor service for retention cleanup
///
/// Responsible for:
/// - Resolving a retention policy to a single cutoff per run
/// - Taking a backup before anything is deleted
/// - Deleting old rows table by table in dependency order, in one transaction
/// - Collecting metrics across runs
///
/// # Examples
///
/// ```no_run
/// use flowsweep_domain::RetentionPolicy;
/// use flowsweep_janitor::{Janitor, JanitorConfig};
/// use flowsweep_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::open("prefect.db")?;
/// let mut janitor = Janitor::prefect(JanitorConfig::default());
///
/// let report = janitor.run(&mut store, &RetentionPolicy::monthly(), false)?;
/// println!("Deleted {} rows", report.total_deleted());
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    schema: SchemaModel,
    backup: Option<BackupHandler>,
    metrics: JanitorMetrics,
}

impl Janitor {
    /// Create a new Janitor over the tables of `schema`
    pub fn new(config: JanitorConfig, schema: SchemaModel) -> Self {
        Self {
            config,
            schema,
            backup: None,
            metrics: JanitorMetrics::new(),
        }
    }

    /// Create a Janitor for the default Prefect tables
    pub fn prefect(config: JanitorConfig) -> Self {
        Self::new(config, SchemaModel::prefect())
    }

    /// Attach the handler used when a run asks for a backup
    pub fn with_backup(mut self, handler: BackupHandler) -> Self {
        self.backup = Some(handler);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Tables this janitor cleans
    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    /// Attached backup handler, if any
    pub fn backup_handler(&self) -> Option<&BackupHandler> {
        self.backup.as_ref()
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Run a cleanup using the configured retention and backup setting
    pub fn run_configured<S>(&mut self, store: &mut S) -> Result<CleanupReport, JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let policy = self.config.policy()?;
        let backup = self.config.backup_before_cleanup;
        self.run(store, &policy, backup)
    }

    /// Delete every row older than the policy's cutoff
    ///
    /// This is the main entry point for cleanup operations. It:
    /// 1. Resolves `policy` to one cutoff used for every table
    /// 2. Opens the write transaction
    /// 3. Takes a backup if `backup` is set; failure aborts before any delete
    /// 4. Deletes in [`SchemaModel::deletion_order`] inside the transaction
    /// 5. Commits, or rolls everything back on the first failed delete
    ///
    /// In dry-run mode only the would-be counts are reported.
    pub fn run<S>(&mut self, store: &mut S, policy: &RetentionPolicy, backup: bool) -> Result<CleanupReport, JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        self.run_at(store, policy, backup, now_timestamp())
    }

    /// [`Janitor::run`] with an explicit "now"
    pub fn run_at<S>(
        &mut self,
        store: &mut S,
        policy: &RetentionPolicy,
        backup: bool,
        now: Timestamp,
    ) -> Result<CleanupReport, JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let result = self.execute(store, policy, backup, now);
        match &result {
            Ok(report) => self.metrics.record_run(report),
            Err(_) => self.metrics.record_failure(),
        }
        result
    }

    fn execute<S>(
        &self,
        store: &mut S,
        policy: &RetentionPolicy,
        backup: bool,
        now: Timestamp,
    ) -> Result<CleanupReport, JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let start = Instant::now();
        let cutoff = policy.resolve(now);

        if self.config.dry_run {
            let monitor = Monitor::new(MonitorConfig::default(), self.schema.clone());
            let counts = monitor.preview_at(&*store, cutoff)?;
            let report = CleanupReport::new(cutoff, policy.days(), counts, start.elapsed(), true, None);
            tracing::info!(
                "DRY RUN: would delete {} rows older than {} days",
                report.total_deleted(),
                policy.days()
            );
            return Ok(report);
        }

        let order = self.schema.deletion_order()?;

        let handler = if backup {
            Some(self.backup.as_ref().ok_or_else(|| {
                JanitorError::Config("backup requested but no backup handler is configured".to_string())
            })?)
        } else {
            None
        };

        tracing::info!("Starting cleanup: {} (cutoff {})", policy, cutoff);

        // The write lock is held from before the snapshot until commit, so no
        // other writer can land rows the backup would miss
        store
            .begin()
            .map_err(|e| JanitorError::Store(format!("could not start transaction: {}", e)))?;

        let record = match handler.map(BackupHandler::create).transpose() {
            Ok(record) => record,
            Err(e) => {
                if let Err(rollback) = store.rollback() {
                    tracing::error!("Rollback failed: {}", rollback);
                }
                return Err(e.into());
            }
        };

        let mut deletions = Vec::with_capacity(order.len());
        for table in order {
            match store.delete_older_than(table.name(), table.timestamp_column(), cutoff) {
                Ok(rows) => {
                    tracing::debug!("Deleted {} rows from {}", rows, table.name());
                    deletions.push(TableDeletion {
                        table: table.name().to_string(),
                        rows,
                    });
                }
                Err(e) => {
                    tracing::warn!("Delete from {} failed, rolling back: {}", table.name(), e);
                    if let Err(rollback) = store.rollback() {
                        tracing::error!("Rollback failed: {}", rollback);
                    }
                    return Err(JanitorError::Deletion {
                        table: table.name().to_string(),
                        cutoff,
                        source: Box::new(e),
                    });
                }
            }
        }

        if let Err(e) = store.commit() {
            tracing::warn!("Commit failed, rolling back: {}", e);
            if let Err(rollback) = store.rollback() {
                tracing::error!("Rollback failed: {}", rollback);
            }
            return Err(JanitorError::Store(format!("commit failed: {}", e)));
        }

        let report = CleanupReport::new(cutoff, policy.days(), deletions, start.elapsed(), false, record);
        tracing::info!(
            "Cleanup completed: {} rows deleted in {:?}",
            report.total_deleted(),
            report.elapsed()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use flowsweep_backup::{BackupConfig, BackupHandler, FileSnapshot};
    use flowsweep_domain::{ReadStore, SECONDS_PER_DAY};
    use tempfile::TempDir;

    const NOW: Timestamp = 1_750_000_000;

    fn prefect_store() -> MemoryStore {
        MemoryStore::new([
            "flow_run",
            "flow_run_state",
            "task_run",
            "task_run_state",
            "log",
            "artifact",
            "events",
            "event_resources",
        ])
    }

    fn config(backup: bool) -> JanitorConfig {
        JanitorConfig {
            backup_before_cleanup: backup,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_deletes_in_dependency_order() {
        let mut store = prefect_store();
        store.insert("log", NOW - 40 * SECONDS_PER_DAY);
        store.insert("log", NOW - SECONDS_PER_DAY);
        store.insert("flow_run", NOW - 40 * SECONDS_PER_DAY);

        let mut janitor = Janitor::prefect(config(false));
        let report = janitor.run_at(&mut store, &RetentionPolicy::monthly(), false, NOW).unwrap();

        assert_eq!(report.cutoff(), NOW - 30 * SECONDS_PER_DAY);
        assert_eq!(report.retention_days(), 30);
        assert_eq!(report.deleted("log"), Some(1));
        assert_eq!(report.deleted("flow_run"), Some(1));
        assert_eq!(report.deleted("events"), Some(0));
        assert_eq!(report.total_deleted(), 2);
        assert!(!report.is_dry_run());
        assert!(report.backup().is_none());

        let order: Vec<&str> = report.deletions().iter().map(|d| d.table.as_str()).collect();
        assert_eq!(store.delete_log(), order);
        let log_pos = order.iter().position(|t| *t == "log").unwrap();
        let flow_pos = order.iter().position(|t| *t == "flow_run").unwrap();
        assert!(log_pos < flow_pos);
    }

    #[test]
    fn test_zero_days_keeps_rows_at_cutoff() {
        let mut store = prefect_store();
        store.insert("events", NOW);
        store.insert("events", NOW - 1);

        let mut janitor = Janitor::prefect(config(false));
        let report = janitor
            .run_at(&mut store, &RetentionPolicy::custom(0).unwrap(), false, NOW)
            .unwrap();

        assert_eq!(report.cutoff(), NOW);
        assert_eq!(report.deleted("events"), Some(1));
        assert_eq!(store.count_rows("events").unwrap(), 1);
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let mut store = prefect_store();
        for table in ["log", "task_run", "flow_run"] {
            store.insert(table, NOW - 90 * SECONDS_PER_DAY);
        }
        // flow_run is last in the Prefect order
        store.fail_on("flow_run");

        let mut janitor = Janitor::prefect(config(false));
        let err = janitor
            .run_at(&mut store, &RetentionPolicy::monthly(), false, NOW)
            .unwrap_err();

        match err {
            JanitorError::Deletion { table, cutoff, .. } => {
                assert_eq!(table, "flow_run");
                assert_eq!(cutoff, NOW - 30 * SECONDS_PER_DAY);
            }
            other => panic!("unexpected error: {}", other),
        }
        for table in ["log", "task_run", "flow_run"] {
            assert_eq!(store.count_rows(table).unwrap(), 1, "{} changed", table);
        }
        assert!(!store.in_transaction());
        assert_eq!(janitor.metrics().failures, 1);
        assert_eq!(janitor.metrics().runs, 0);
    }

    #[test]
    fn test_second_run_deletes_nothing() {
        let mut store = prefect_store();
        store.insert("log", NOW - 60 * SECONDS_PER_DAY);
        store.insert("log", NOW);

        let mut janitor = Janitor::prefect(config(false));
        let policy = RetentionPolicy::monthly();
        assert_eq!(janitor.run_at(&mut store, &policy, false, NOW).unwrap().total_deleted(), 1);
        assert_eq!(janitor.run_at(&mut store, &policy, false, NOW).unwrap().total_deleted(), 0);
        assert_eq!(janitor.metrics().runs, 2);
        assert_eq!(janitor.metrics().total_deleted(), 1);
    }

    #[test]
    fn test_dry_run_deletes_nothing() {
        let mut store = prefect_store();
        store.insert("log", NOW - 60 * SECONDS_PER_DAY);

        let mut janitor = Janitor::prefect(JanitorConfig {
            dry_run: true,
            ..Default::default()
        });
        // No handler attached: a dry run never backs up, so this is not an error
        let report = janitor.run_at(&mut store, &RetentionPolicy::monthly(), true, NOW).unwrap();

        assert!(report.is_dry_run());
        assert_eq!(report.deleted("log"), Some(1));
        assert_eq!(store.count_rows("log").unwrap(), 1);
        assert!(store.delete_log().is_empty());
    }

    #[test]
    fn test_backup_without_handler_is_config_error() {
        let mut store = prefect_store();
        store.insert("log", NOW - 60 * SECONDS_PER_DAY);

        let mut janitor = Janitor::prefect(config(true));
        let err = janitor.run_configured(&mut store).unwrap_err();

        assert!(matches!(err, JanitorError::Config(_)));
        assert_eq!(store.count_rows("log").unwrap(), 1);
    }

    #[test]
    fn test_backup_failure_aborts_before_delete() {
        let dir = TempDir::new().unwrap();
        let handler = BackupHandler::with_strategy(
            Box::new(FileSnapshot::new(dir.path().join("missing.db"))),
            BackupConfig::in_directory(dir.path().join("backups")),
        );

        let mut store = prefect_store();
        store.insert("log", NOW - 60 * SECONDS_PER_DAY);

        let mut janitor = Janitor::prefect(config(true)).with_backup(handler);
        let err = janitor
            .run_at(&mut store, &RetentionPolicy::monthly(), true, NOW)
            .unwrap_err();

        assert!(matches!(err, JanitorError::Backup(_)));
        assert_eq!(store.count_rows("log").unwrap(), 1);
        assert!(store.delete_log().is_empty());
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_cyclic_schema_fails_before_backup() {
        let schema = SchemaModel::new([
            flowsweep_domain::TableDescriptor::new("a", "created").references("b"),
            flowsweep_domain::TableDescriptor::new("b", "created").references("a"),
        ])
        .unwrap();
        let mut store = MemoryStore::new(["a", "b"]);

        let mut janitor = Janitor::new(config(true), schema);
        let err = janitor
            .run_at(&mut store, &RetentionPolicy::weekly(), true, NOW)
            .unwrap_err();
        assert!(matches!(err, JanitorError::Schema(_)));
    }
}

//! Background worker for scheduled cleanup

use crate::{Janitor, JanitorError, JanitorMetrics};
use flowsweep_domain::{CleanupReport, PurgeStore};
use tokio::time::{interval, Duration};

/// Background worker that runs the Janitor on a schedule
///
/// Each tick runs one cleanup with the janitor's configured retention. Runs
/// are synchronous, so a shutdown signal only takes effect between runs and
/// never interrupts an open transaction.
///
/// # Examples
///
/// ```no_run
/// use flowsweep_janitor::{Janitor, JanitorConfig, JanitorWorker};
/// use flowsweep_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::open("prefect.db")?;
///     let janitor = Janitor::prefect(JanitorConfig {
///         backup_before_cleanup: false,
///         ..Default::default()
///     });
///     let mut worker = JanitorWorker::new(janitor)?;
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(store).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a worker ticking at the janitor's `sweep_interval_minutes`
    pub fn new(janitor: Janitor) -> Result<Self, JanitorError> {
        let interval = janitor.config().sweep_interval()?;
        Ok(Self { janitor, interval })
    }

    /// Time between runs
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// Failed runs are logged and the worker keeps going.
    pub async fn run<S>(&mut self, mut store: S) -> Result<(), JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let mut ticker = interval(self.interval);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting scheduled cleanup");

                    match self.run_once(&mut store) {
                        Ok(report) => {
                            tracing::info!("Scheduled cleanup completed: {} rows deleted", report.total_deleted());
                        }
                        Err(e) => {
                            tracing::error!("Scheduled cleanup failed: {}", e);
                        }
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        return Err(JanitorError::Worker(format!("cannot listen for shutdown signal: {}", e)));
                    }
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!("Janitor stopped. Final metrics:\n{}", self.janitor.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles, stopping at the first failure
    pub async fn run_cycles<S>(&mut self, mut store: S, cycles: usize) -> Result<(), JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting cleanup cycle {}/{}", cycle + 1, cycles);

            match self.run_once(&mut store) {
                Ok(report) => {
                    tracing::info!(
                        "Cleanup {}/{} completed: {} rows deleted",
                        cycle + 1,
                        cycles,
                        report.total_deleted()
                    );
                }
                Err(e) => {
                    tracing::error!("Cleanup {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            self.janitor.metrics().summary()
        );

        Ok(())
    }

    /// One cleanup, then prune backups if the run took one
    fn run_once<S>(&mut self, store: &mut S) -> Result<CleanupReport, JanitorError>
    where
        S: PurgeStore,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let report = self.janitor.run_configured(store)?;

        if report.backup().is_some() {
            if let Some(handler) = self.janitor.backup_handler() {
                let keep = i64::from(handler.config().keep);
                match handler.cleanup_old_backups(keep) {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Pruned {} old backups", n),
                    Err(e) => tracing::warn!("Could not prune old backups: {}", e),
                }
            }
        }

        Ok(report)
    }

    /// The janitor driven by this worker
    pub fn janitor(&self) -> &Janitor {
        &self.janitor
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use crate::{now_timestamp, JanitorConfig};
    use flowsweep_backup::{BackupConfig, BackupHandler, FileSnapshot};
    use flowsweep_domain::{SchemaModel, TableDescriptor, SECONDS_PER_DAY};
    use tempfile::TempDir;

    fn log_only() -> SchemaModel {
        SchemaModel::new([TableDescriptor::new("log", "created")]).unwrap()
    }

    fn config(backup: bool) -> JanitorConfig {
        JanitorConfig {
            backup_before_cleanup: backup,
            sweep_interval_minutes: 1,
            ..Default::default()
        }
    }

    fn old_rows(n: u64) -> MemoryStore {
        let mut store = MemoryStore::new(["log"]);
        for i in 0..n {
            store.insert("log", now_timestamp() - 60 * SECONDS_PER_DAY - i);
        }
        store
    }

    #[test]
    fn test_zero_interval_rejected() {
        let janitor = Janitor::new(
            JanitorConfig {
                sweep_interval_minutes: 0,
                ..Default::default()
            },
            log_only(),
        );
        assert!(matches!(JanitorWorker::new(janitor), Err(JanitorError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles() {
        let mut worker = JanitorWorker::new(Janitor::new(config(false), log_only())).unwrap();
        assert_eq!(worker.interval(), Duration::from_secs(60));

        worker.run_cycles(old_rows(3), 2).await.unwrap();

        assert_eq!(worker.metrics().runs, 2);
        assert_eq!(worker.metrics().total_deleted(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_stops_run_cycles() {
        let mut store = old_rows(1);
        store.fail_on("log");

        let mut worker = JanitorWorker::new(Janitor::new(config(false), log_only())).unwrap();
        let result = worker.run_cycles(store, 3).await;

        assert!(matches!(result, Err(JanitorError::Deletion { .. })));
        assert_eq!(worker.metrics().failures, 1);
        assert_eq!(worker.metrics().runs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backups_pruned_after_each_run() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("prefect.db");
        rusqlite::Connection::open(&db)
            .unwrap()
            .execute_batch("CREATE TABLE log (created TEXT);")
            .unwrap();

        let handler = BackupHandler::with_strategy(
            Box::new(FileSnapshot::new(&db)),
            BackupConfig {
                keep: 2,
                ..BackupConfig::in_directory(dir.path().join("backups"))
            },
        );
        let janitor = Janitor::new(config(true), log_only()).with_backup(handler);

        let mut worker = JanitorWorker::new(janitor).unwrap();
        worker.run_cycles(old_rows(1), 4).await.unwrap();

        assert_eq!(worker.metrics().backups, 4);
        let remaining = worker.janitor().backup_handler().unwrap().list_backups().unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_metrics() {
        let mut worker = JanitorWorker::new(Janitor::new(config(false), log_only())).unwrap();

        worker.run_cycles(MemoryStore::new(["log"]), 1).await.unwrap();
        assert_eq!(worker.metrics().runs, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().runs, 0);
    }
}

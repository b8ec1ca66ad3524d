//! Watch command implementation.

use super::{backup_handler, open_store};
use crate::cli::WatchArgs;
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::output::Formatter;
use flowsweep_domain::DatabaseTarget;
use flowsweep_janitor::{Janitor, JanitorWorker};

/// Execute the watch command.
pub async fn execute_watch(
    args: WatchArgs,
    config: &Config,
    target: &DatabaseTarget,
    formatter: &Formatter,
) -> Result<()> {
    let mut janitor_config = config.janitor.clone();
    if let Some(minutes) = args.interval {
        janitor_config.sweep_interval_minutes = minutes;
    }
    let backup = janitor_config.backup_before_cleanup && !janitor_config.dry_run;

    let store = open_store(target, config, "watch")?;
    let mut janitor = Janitor::prefect(janitor_config);
    if backup {
        janitor = janitor.with_backup(backup_handler(target, config)?);
    }

    let mut worker = JanitorWorker::new(janitor)?;
    if formatter.format() == OutputFormat::Table {
        println!(
            "{}",
            formatter.info(&format!(
                "Cleaning {} every {} minutes (Ctrl+C to stop)",
                target.identity(),
                worker.interval().as_secs() / 60
            ))
        );
    }

    match args.cycles {
        Some(cycles) => worker.run_cycles(store, cycles).await?,
        None => worker.run(store).await?,
    }

    match formatter.format() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(worker.metrics())?),
        OutputFormat::Quiet => println!("{}", worker.metrics().total_deleted()),
        OutputFormat::Table => println!("{}", worker.metrics().summary()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::fixture;
    use crate::error::CliError;
    use flowsweep_janitor::JanitorError;

    #[tokio::test(start_paused = true)]
    async fn test_watch_runs_cycles() {
        let fx = fixture(3, 1);
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let args = WatchArgs {
            cycles: Some(2),
            interval: Some(1),
        };

        execute_watch(args, &fx.config, &fx.target, &formatter).await.unwrap();

        assert_eq!(fx.log_rows(), 1);
        let handler = backup_handler(&fx.target, &fx.config).unwrap();
        assert_eq!(handler.list_backups().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_watch_rejects_zero_interval() {
        let fx = fixture(0, 0);
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let args = WatchArgs {
            cycles: Some(1),
            interval: Some(0),
        };

        let result = execute_watch(args, &fx.config, &fx.target, &formatter).await;
        assert!(matches!(result, Err(CliError::Janitor(JanitorError::Config(_)))));
    }
}

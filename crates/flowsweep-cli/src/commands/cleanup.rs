//! Cleanup command implementation.

use super::{backup_handler, confirm_with, open_store};
use crate::cli::CleanupArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::{group_digits, Formatter};
use flowsweep_domain::{DatabaseTarget, RetentionPolicy, SchemaModel, Timestamp};
use flowsweep_janitor::{now_timestamp, Janitor, JanitorConfig, Monitor};
use std::io::{self, BufRead};

/// Execute the cleanup command.
pub fn execute_cleanup(
    args: CleanupArgs,
    config: &Config,
    target: &DatabaseTarget,
    formatter: &Formatter,
) -> Result<()> {
    cleanup_at(args, config, target, formatter, now_timestamp(), io::stdin().lock())
}

/// Cleanup with "now" fixed once, so the confirmed preview and the run share
/// one cutoff however long the prompt waits.
fn cleanup_at(
    args: CleanupArgs,
    config: &Config,
    target: &DatabaseTarget,
    formatter: &Formatter,
    now: Timestamp,
    input: impl BufRead,
) -> Result<()> {
    let policy = resolve_policy(&args, &config.janitor)?;

    let mut janitor_config = config.janitor.clone();
    janitor_config.dry_run |= args.dry_run;
    let backup = janitor_config.backup_before_cleanup && !args.no_backup && !janitor_config.dry_run;

    let mut store = open_store(target, config, "cleanup")?;

    // Confirm deletion unless --yes is specified
    if !janitor_config.dry_run && !args.yes {
        let monitor = Monitor::new(config.monitor, SchemaModel::prefect());
        let preview = monitor.preview_at(&store, policy.resolve(now))?;
        let total: u64 = preview.iter().map(|d| d.rows).sum();

        if total == 0 {
            println!("{}", formatter.info(&format!("Nothing older than {} days", policy.days())));
            return Ok(());
        }

        println!("{}", formatter.deletions(&preview, true));
        let prompt = format!(
            "Delete {} rows older than {} from {}{}?",
            group_digits(total),
            policy,
            target.identity(),
            if backup { " (a backup is taken first)" } else { "" }
        );
        if !confirm_with(input, &prompt)? {
            println!("{}", formatter.info("Operation cancelled"));
            return Ok(());
        }
    }

    let mut janitor = Janitor::prefect(janitor_config);
    if backup {
        janitor = janitor.with_backup(backup_handler(target, config)?);
    }

    let report = janitor.run_at(&mut store, &policy, backup, now)?;
    println!("{}", formatter.cleanup_report(&report)?);
    Ok(())
}

/// `--days` or `--policy`, falling back to the configured retention.
fn resolve_policy(args: &CleanupArgs, janitor: &JanitorConfig) -> Result<RetentionPolicy> {
    if let Some(days) = args.days {
        return Ok(RetentionPolicy::custom(days)?);
    }
    if let Some(policy) = &args.policy {
        return Ok(policy.parse::<RetentionPolicy>()?);
    }
    Ok(janitor.policy()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::fixture;
    use crate::config::OutputFormat;
    use crate::error::CliError;
    use flowsweep_domain::SECONDS_PER_DAY;
    use std::io::Cursor;

    fn args(no_backup: bool, dry_run: bool) -> CleanupArgs {
        CleanupArgs {
            days: None,
            policy: None,
            no_backup,
            dry_run,
            yes: true,
        }
    }

    fn quiet() -> Formatter {
        Formatter::new(OutputFormat::Quiet, false)
    }

    #[test]
    fn test_resolve_policy() {
        let config = JanitorConfig::default();

        let mut a = args(false, false);
        assert_eq!(resolve_policy(&a, &config).unwrap().days(), 30);

        a.days = Some(3);
        assert_eq!(resolve_policy(&a, &config).unwrap().days(), 3);

        a.days = None;
        a.policy = Some("staging".to_string());
        assert_eq!(resolve_policy(&a, &config).unwrap().days(), 7);

        a.policy = Some("forever".to_string());
        assert!(matches!(resolve_policy(&a, &config), Err(CliError::Policy(_))));

        a.policy = None;
        a.days = Some(-1);
        assert!(matches!(resolve_policy(&a, &config), Err(CliError::Policy(_))));
    }

    #[test]
    fn test_cleanup_without_backup() {
        let fx = fixture(4, 2);
        execute_cleanup(args(true, false), &fx.config, &fx.target, &quiet()).unwrap();

        assert_eq!(fx.log_rows(), 2);
        assert!(!fx.config.backup.directory.exists());
    }

    #[test]
    fn test_cleanup_takes_backup_first() {
        let fx = fixture(4, 2);
        execute_cleanup(args(false, false), &fx.config, &fx.target, &quiet()).unwrap();

        assert_eq!(fx.log_rows(), 2);
        let handler = backup_handler(&fx.target, &fx.config).unwrap();
        assert_eq!(handler.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let fx = fixture(4, 2);
        execute_cleanup(args(false, true), &fx.config, &fx.target, &quiet()).unwrap();

        assert_eq!(fx.log_rows(), 6);
        assert!(!fx.config.backup.directory.exists());
    }

    #[test]
    fn test_confirmed_run_uses_previewed_cutoff() {
        let fx = fixture(4, 2);
        let mut a = args(true, false);
        a.yes = false;

        // 30 days after "now" every fixture row is past the cutoff; a run that
        // re-read the clock would keep the 2 recent rows
        let later = now_timestamp() + 30 * SECONDS_PER_DAY;
        cleanup_at(a, &fx.config, &fx.target, &quiet(), later, Cursor::new("y\n")).unwrap();

        assert_eq!(fx.log_rows(), 0);
    }

    #[test]
    fn test_declined_prompt_deletes_nothing() {
        let fx = fixture(4, 2);
        let mut a = args(false, false);
        a.yes = false;

        cleanup_at(a, &fx.config, &fx.target, &quiet(), now_timestamp(), Cursor::new("n\n")).unwrap();

        assert_eq!(fx.log_rows(), 6);
        assert!(!fx.config.backup.directory.exists());
    }

    #[test]
    fn test_configured_dry_run() {
        let mut fx = fixture(1, 0);
        fx.config.janitor.dry_run = true;
        execute_cleanup(args(false, false), &fx.config, &fx.target, &quiet()).unwrap();
        assert_eq!(fx.log_rows(), 1);
    }
}

//! Backup command implementation.

use super::{backup_handler, confirm};
use crate::cli::{BackupAction, BackupArgs};
use crate::config::{Config, OutputFormat};
use crate::error::Result;
use crate::output::Formatter;
use flowsweep_backup::BackupHandler;
use flowsweep_domain::DatabaseTarget;

/// Execute the backup command.
pub fn execute_backup(args: BackupArgs, config: &Config, target: &DatabaseTarget, formatter: &Formatter) -> Result<()> {
    let handler = backup_handler(target, config)?;

    match args.action {
        BackupAction::Create { name } => create_backup(&handler, name, formatter),
        BackupAction::List => list_backups(&handler, formatter),
        BackupAction::Prune { keep } => {
            prune_backups(&handler, keep.unwrap_or_else(|| i64::from(config.backup.keep)), formatter)
        }
        BackupAction::Restore { backup, yes } => restore_backup(&handler, target, &backup, yes, formatter),
    }
}

/// Create a backup now.
fn create_backup(handler: &BackupHandler, name: Option<String>, formatter: &Formatter) -> Result<()> {
    let record = match name {
        Some(name) => handler.create_named(&name)?,
        None => handler.create()?,
    };
    println!("{}", formatter.backup_created(&record)?);
    Ok(())
}

/// List backups, newest first.
fn list_backups(handler: &BackupHandler, formatter: &Formatter) -> Result<()> {
    let records = handler.list_backups()?;
    println!("{}", formatter.backups(&records)?);
    Ok(())
}

/// Keep only the most recent backups.
fn prune_backups(handler: &BackupHandler, keep: i64, formatter: &Formatter) -> Result<()> {
    let deleted = handler.cleanup_old_backups(keep)?;
    match formatter.format() {
        OutputFormat::Quiet => println!("{}", deleted),
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": deleted, "kept": keep })),
        OutputFormat::Table => {
            let message = format!("Deleted {} old backup(s), keeping {} most recent", deleted, keep);
            println!("{}", formatter.success(&message));
        }
    }
    Ok(())
}

/// Replace the database with a backup.
fn restore_backup(
    handler: &BackupHandler,
    target: &DatabaseTarget,
    backup: &str,
    yes: bool,
    formatter: &Formatter,
) -> Result<()> {
    let record = handler.find(backup)?;
    handler.verify(&record)?;

    // Confirm restore unless --yes is specified
    if !yes {
        println!(
            "{}",
            formatter.warning(&format!(
                "Restoring replaces ALL data in {} with {}",
                target.identity(),
                record.name
            ))
        );
        if !confirm("Continue?")? {
            println!("{}", formatter.info("Operation cancelled"));
            return Ok(());
        }
    }

    handler.restore(&record)?;
    println!("{}", formatter.success(&format!("Restored {} from {}", target.identity(), record.name)));
    Ok(())
}

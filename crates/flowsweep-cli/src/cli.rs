//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// flowsweep - Retention cleanup for Prefect metadata databases.
#[derive(Debug, Parser)]
#[command(name = "flowsweep")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Database URL (sqlite:///path, bare path, or postgresql://...)
    #[arg(short, long, global = true, env = "FLOWSWEEP_DATABASE_URL")]
    pub database: Option<String>,

    /// Directory holding backups
    #[arg(short, long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (minimal)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show row counts, size and health of the database
    Status,

    /// Delete rows older than the retention window
    Cleanup(CleanupArgs),

    /// Create, list, prune and restore backups
    Backup(BackupArgs),

    /// Print the order in which tables are purged
    Order,

    /// List retention presets
    Policies,

    /// Run cleanup on a schedule until interrupted
    Watch(WatchArgs),
}

/// Arguments for the cleanup command.
#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Days of data to keep
    #[arg(long, conflicts_with = "policy", allow_negative_numbers = true)]
    pub days: Option<i64>,

    /// Retention preset (daily, weekly, monthly, quarterly, or an alias)
    #[arg(short, long)]
    pub policy: Option<String>,

    /// Skip the pre-cleanup backup
    #[arg(long)]
    pub no_backup: bool,

    /// Show what would be deleted without deleting
    #[arg(long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the backup command.
#[derive(Debug, Args)]
pub struct BackupArgs {
    #[command(subcommand)]
    pub action: BackupAction,
}

/// Backup actions.
#[derive(Debug, Subcommand)]
pub enum BackupAction {
    /// Back up the database now
    Create {
        /// Backup name (default: timestamped)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List backups, newest first
    List,

    /// Delete all but the most recent backups
    Prune {
        /// Backups to keep (default: from config)
        #[arg(short, long, allow_negative_numbers = true)]
        keep: Option<i64>,
    },

    /// Replace the database with a backup
    Restore {
        /// Backup name or path
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many runs
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Minutes between runs (default: from config)
    #[arg(short, long)]
    pub interval: Option<u64>,
}

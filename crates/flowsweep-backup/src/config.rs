//! Configuration for backup operations

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where backups go, how many to keep, and which utilities to run for
/// server-backed databases
///
/// # Examples
///
/// ```
/// use flowsweep_backup::BackupConfig;
///
/// let config = BackupConfig::default();
/// assert_eq!(config.keep, 5);
/// assert_eq!(config.dump_program, "pg_dump");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory holding backup artifacts
    /// Default: `backups`
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Number of most recent backups kept by pruning
    /// Default: 5
    #[serde(default = "default_keep")]
    pub keep: u32,

    /// File name prefix for generated backup names
    /// Default: `prefect_backup`
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Dump utility for server-backed databases
    /// Default: `pg_dump`
    #[serde(default = "default_dump_program")]
    pub dump_program: String,

    /// Restore utility for server-backed databases
    /// Default: `psql`
    #[serde(default = "default_restore_program")]
    pub restore_program: String,
}

fn default_directory() -> PathBuf {
    PathBuf::from("backups")
}

fn default_keep() -> u32 {
    5
}

fn default_prefix() -> String {
    "prefect_backup".to_string()
}

fn default_dump_program() -> String {
    "pg_dump".to_string()
}

fn default_restore_program() -> String {
    "psql".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            keep: default_keep(),
            prefix: default_prefix(),
            dump_program: default_dump_program(),
            restore_program: default_restore_program(),
        }
    }
}

impl BackupConfig {
    /// Default configuration writing to `directory`
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }
}

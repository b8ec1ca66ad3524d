//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use flowsweep_backup::BackupConfig;
use flowsweep_domain::DatabaseTarget;
use flowsweep_janitor::{JanitorConfig, MonitorConfig};
use flowsweep_store::TimestampEncoding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable Prefect itself reads the database URL from
pub const PREFECT_DATABASE_ENV: &str = "PREFECT_API_DATABASE_CONNECTION_URL";

/// CLI configuration.
///
/// Every section is optional; missing keys take their defaults.
///
/// ```toml
/// [database]
/// url = "sqlite:////home/me/.prefect/prefect.db"
///
/// [backup]
/// directory = "/var/backups/prefect"
/// keep = 5
///
/// [janitor]
/// retention = "monthly"
/// backup_before_cleanup = true
///
/// [monitor]
/// attention_rows = 100000
/// critical_rows = 500000
///
/// [settings]
/// color = true
/// format = "table"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database location and encoding
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Backup directory, retention and dump utilities
    #[serde(default)]
    pub backup: BackupConfig,

    /// Cleanup behaviour
    #[serde(default)]
    pub janitor: JanitorConfig,

    /// Health thresholds
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Database settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// How timestamp columns are stored
    #[serde(default)]
    pub timestamp_encoding: TimestampEncoding,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".flowsweep").join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if it is missing.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Pick the database to work on.
    ///
    /// Precedence: `--database` / `FLOWSWEEP_DATABASE_URL`, then
    /// `PREFECT_API_DATABASE_CONNECTION_URL`, then the config file, then
    /// Prefect's default `~/.prefect/prefect.db`.
    pub fn resolve_database(&self, flag: Option<&str>, prefect_env: Option<&str>) -> Result<DatabaseTarget> {
        let url = flag
            .or(prefect_env)
            .or(self.database.url.as_deref())
            .map(str::to_string);

        let url = match url {
            Some(url) => url,
            None => {
                let home =
                    dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
                home.join(".prefect").join("prefect.db").display().to_string()
            }
        };

        Ok(DatabaseTarget::parse(&url)?)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

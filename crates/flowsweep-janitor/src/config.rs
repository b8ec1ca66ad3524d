//! Configuration for Janitor operations
//!
//! Defines the retention window, backup behaviour and sweep interval.

use crate::JanitorError;
use flowsweep_domain::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Janitor service
///
/// # Examples
///
/// ```
/// use flowsweep_janitor::JanitorConfig;
///
/// // Default configuration (balanced)
/// let config = JanitorConfig::default();
/// assert_eq!(config.policy().unwrap().days(), 30);
///
/// // Aggressive cleanup
/// let config = JanitorConfig::aggressive();
/// assert_eq!(config.policy().unwrap().days(), 7);
///
/// // Lenient cleanup
/// let config = JanitorConfig::lenient();
/// assert_eq!(config.policy().unwrap().days(), 90);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Retention window: a preset or alias name (`monthly`, `production`),
    /// or a day count (`30`, `30d`)
    /// Default: `monthly`
    #[serde(default = "default_retention")]
    pub retention: String,

    /// Take a backup before deleting anything
    /// Default: true
    #[serde(default = "default_backup_before_cleanup")]
    pub backup_before_cleanup: bool,

    /// Dry-run mode: report what would be deleted without deleting or
    /// backing up
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// How often the worker runs a cleanup (in minutes)
    /// Default: 1440 (daily)
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
}

fn default_retention() -> String {
    "monthly".to_string()
}

fn default_backup_before_cleanup() -> bool {
    true
}

fn default_sweep_interval_minutes() -> u64 {
    24 * 60
}

impl Default for JanitorConfig {
    /// Balanced cleanup: 30 days kept, backup first, daily sweeps
    fn default() -> Self {
        Self {
            retention: default_retention(),
            backup_before_cleanup: default_backup_before_cleanup(),
            dry_run: false,
            sweep_interval_minutes: default_sweep_interval_minutes(),
        }
    }
}

impl JanitorConfig {
    /// Aggressive cleanup: one week kept, sweeps every 6 hours
    ///
    /// Suitable for busy servers where the database grows quickly.
    pub fn aggressive() -> Self {
        Self {
            retention: "weekly".to_string(),
            sweep_interval_minutes: 6 * 60,
            ..Self::default()
        }
    }

    /// Lenient cleanup: one quarter kept, weekly sweeps
    ///
    /// Suitable when run history is needed for audits.
    pub fn lenient() -> Self {
        Self {
            retention: "quarterly".to_string(),
            sweep_interval_minutes: 7 * 24 * 60,
            ..Self::default()
        }
    }

    /// Parse [`JanitorConfig::retention`]
    pub fn policy(&self) -> Result<RetentionPolicy, JanitorError> {
        Ok(self.retention.parse::<RetentionPolicy>()?)
    }

    /// Get sweep interval as Duration
    ///
    /// # Errors
    ///
    /// [`JanitorError::Config`] for a zero interval, which would spin.
    pub fn sweep_interval(&self) -> Result<Duration, JanitorError> {
        if self.sweep_interval_minutes == 0 {
            return Err(JanitorError::Config(
                "sweep_interval_minutes must be greater than 0".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.sweep_interval_minutes.saturating_mul(60)))
    }
}

//! Retention policies
//!
//! A policy is a number of days to keep. It resolves to a single cutoff
//! timestamp; rows strictly older than the cutoff are eligible for deletion.

use crate::{PolicyError, Timestamp};
use std::fmt;
use std::str::FromStr;

/// Seconds in one retention day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Named presets and the number of days they keep
///
/// Environment aliases map onto the same windows: development keeps a day,
/// staging a week, production a month, compliance a quarter.
pub const PRESETS: &[(&str, u32)] = &[
    ("daily", 1),
    ("weekly", 7),
    ("monthly", 30),
    ("quarterly", 90),
    ("development", 1),
    ("staging", 7),
    ("production", 30),
    ("compliance", 90),
];

/// Retention policy: keep the last `days` days of data
///
/// # Examples
///
/// ```
/// use flowsweep_domain::RetentionPolicy;
///
/// let policy = RetentionPolicy::monthly();
/// assert_eq!(policy.days(), 30);
/// assert_eq!(policy.resolve(40 * 86_400), 10 * 86_400);
///
/// let parsed: RetentionPolicy = "14d".parse().unwrap();
/// assert_eq!(parsed.days(), 14);
/// assert!(RetentionPolicy::custom(-1).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    name: String,
    days: u32,
}

impl RetentionPolicy {
    /// Keep the last 24 hours
    pub fn daily() -> Self {
        Self::preset("daily", 1)
    }

    /// Keep the last 7 days
    pub fn weekly() -> Self {
        Self::preset("weekly", 7)
    }

    /// Keep the last 30 days
    pub fn monthly() -> Self {
        Self::preset("monthly", 30)
    }

    /// Keep the last 90 days
    pub fn quarterly() -> Self {
        Self::preset("quarterly", 90)
    }

    fn preset(name: &str, days: u32) -> Self {
        Self {
            name: name.to_string(),
            days,
        }
    }

    /// Custom retention window
    ///
    /// # Errors
    ///
    /// [`PolicyError::InvalidPolicy`] if `days` is negative or too large.
    pub fn custom(days: i64) -> Result<Self, PolicyError> {
        if days < 0 {
            return Err(PolicyError::InvalidPolicy(format!(
                "retention days must be >= 0, got {}",
                days
            )));
        }
        let days = u32::try_from(days).map_err(|_| {
            PolicyError::InvalidPolicy(format!("retention of {} days is out of range", days))
        })?;
        Ok(Self {
            name: "custom".to_string(),
            days,
        })
    }

    /// Look up a preset or environment alias (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self, PolicyError> {
        let lower = name.trim().to_lowercase();
        PRESETS
            .iter()
            .find(|(preset, _)| *preset == lower)
            .map(|(preset, days)| Self::preset(preset, *days))
            .ok_or_else(|| {
                let known: Vec<&str> = PRESETS.iter().map(|(p, _)| *p).collect();
                PolicyError::InvalidPolicy(format!(
                    "unknown policy '{}' (available: {})",
                    name,
                    known.join(", ")
                ))
            })
    }

    /// Policy name (`custom` for explicit day counts)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Days of data kept
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Retention window in seconds
    pub fn window_secs(&self) -> u64 {
        u64::from(self.days) * SECONDS_PER_DAY
    }

    /// Cutoff for a run starting at `now`: `now - days`
    ///
    /// Saturates at the epoch. Rows compare with a strict `<`, so with
    /// `days = 0` the cutoff is `now` and rows stamped exactly `now` survive.
    pub fn resolve(&self, now: Timestamp) -> Timestamp {
        now.saturating_sub(self.window_secs())
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::monthly()
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} days)", self.name, self.days)
    }
}

impl FromStr for RetentionPolicy {
    type Err = PolicyError;

    /// Accepts a preset name, a day count (`30`), or a day count with a `d`
    /// suffix (`30d`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numeric = trimmed.strip_suffix(['d', 'D']).unwrap_or(trimmed);
        match numeric.parse::<i64>() {
            Ok(days) => Self::custom(days),
            Err(_) => Self::from_name(trimmed),
        }
    }
}

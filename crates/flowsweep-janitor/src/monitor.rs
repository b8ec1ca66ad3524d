//! Database size monitoring
//!
//! The monitor only sees the database through [`ReadStore`], so nothing it
//! does can change data.

use crate::{now_timestamp, JanitorError};
use flowsweep_domain::{ReadStore, RetentionPolicy, SchemaModel, TableDeletion, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Row-count thresholds for [`HealthStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Total rows at or above which cleanup is advised
    /// Default: 100 000
    #[serde(default = "default_attention_rows")]
    pub attention_rows: u64,

    /// Total rows at or above which the database is critical
    /// Default: 500 000
    #[serde(default = "default_critical_rows")]
    pub critical_rows: u64,
}

fn default_attention_rows() -> u64 {
    100_000
}

fn default_critical_rows() -> u64 {
    500_000
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            attention_rows: default_attention_rows(),
            critical_rows: default_critical_rows(),
        }
    }
}

/// Health classification of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Below the attention threshold
    Ok,
    /// Cleanup advised
    AttentionNeeded,
    /// Cleanup urgent
    Critical,
}

impl HealthStatus {
    /// Lowercase label used in output
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Ok => "ok",
            HealthStatus::AttentionNeeded => "attention_needed",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row count of one table, or why it could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableCount {
    /// Rows in the table
    Rows(u64),
    /// Counting failed (missing table, permissions)
    Unavailable(String),
}

impl TableCount {
    /// Row count, if available
    pub fn rows(&self) -> Option<u64> {
        match self {
            TableCount::Rows(n) => Some(*n),
            TableCount::Unavailable(_) => None,
        }
    }
}

/// Row counts and size of the database at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    /// When the snapshot was taken (seconds since the Unix epoch)
    pub taken_at: Timestamp,
    /// Count per table, by table name
    pub counts: BTreeMap<String, TableCount>,
    /// Database size in bytes, when the engine reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl DatabaseSnapshot {
    /// Sum of all available counts
    pub fn total_rows(&self) -> u64 {
        self.counts.values().filter_map(TableCount::rows).sum()
    }

    /// Count for one table, if it was read successfully
    pub fn rows(&self, table: &str) -> Option<u64> {
        self.counts.get(table).and_then(TableCount::rows)
    }

    /// Size in megabytes
    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

/// Read-only view of the database's size and health
pub struct Monitor {
    config: MonitorConfig,
    schema: SchemaModel,
}

impl Monitor {
    /// Monitor the tables of `schema`
    pub fn new(config: MonitorConfig, schema: SchemaModel) -> Self {
        Self { config, schema }
    }

    /// Thresholds in use
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Count every table and estimate the database size
    ///
    /// A table that cannot be counted is recorded as
    /// [`TableCount::Unavailable`]; the others are still counted.
    pub fn snapshot<S>(&self, store: &S) -> DatabaseSnapshot
    where
        S: ReadStore,
        S::Error: fmt::Display,
    {
        let counts = self
            .schema
            .tables()
            .map(|table| {
                let count = match store.count_rows(table.name()) {
                    Ok(n) => TableCount::Rows(n),
                    Err(e) => {
                        tracing::warn!("Could not count {}: {}", table.name(), e);
                        TableCount::Unavailable(e.to_string())
                    }
                };
                (table.name().to_string(), count)
            })
            .collect();

        let size_bytes = store.size_bytes().unwrap_or_else(|e| {
            tracing::warn!("Could not estimate database size: {}", e);
            None
        });

        DatabaseSnapshot {
            taken_at: now_timestamp(),
            counts,
            size_bytes,
        }
    }

    /// Classify a snapshot by its total row count
    pub fn health(&self, snapshot: &DatabaseSnapshot) -> HealthStatus {
        let total = snapshot.total_rows();
        if total >= self.config.critical_rows {
            HealthStatus::Critical
        } else if total >= self.config.attention_rows {
            HealthStatus::AttentionNeeded
        } else {
            HealthStatus::Ok
        }
    }

    /// Advice for a database holding `total_rows` rows
    pub fn recommendation(total_rows: u64) -> &'static str {
        match total_rows {
            0..10_000 => "Database is small and healthy",
            10_000..100_000 => "Database is growing but fine",
            100_000..500_000 => "Consider monthly cleanup (30 days retention)",
            500_000..1_000_000 => "Recommend weekly cleanup (7 days retention)",
            _ => "URGENT: Database is very large, cleanup immediately",
        }
    }

    /// Rows a run with `policy` starting now would delete, in deletion order
    pub fn preview<S>(&self, store: &S, policy: &RetentionPolicy) -> Result<Vec<TableDeletion>, JanitorError>
    where
        S: ReadStore,
        S::Error: fmt::Display,
    {
        self.preview_at(store, policy.resolve(now_timestamp()))
    }

    /// Rows strictly older than `cutoff`, per table in deletion order
    pub fn preview_at<S>(&self, store: &S, cutoff: Timestamp) -> Result<Vec<TableDeletion>, JanitorError>
    where
        S: ReadStore,
        S::Error: fmt::Display,
    {
        let mut counts = Vec::with_capacity(self.schema.len());
        for table in self.schema.deletion_order()? {
            let rows = store
                .count_older_than(table.name(), table.timestamp_column(), cutoff)
                .map_err(|e| JanitorError::Store(format!("counting {}: {}", table.name(), e)))?;
            tracing::debug!("{}: {} rows older than cutoff", table.name(), rows);
            counts.push(TableDeletion {
                table: table.name().to_string(),
                rows,
            });
        }
        Ok(counts)
    }
}

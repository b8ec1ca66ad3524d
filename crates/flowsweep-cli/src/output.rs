//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use chrono::{DateTime, Utc};
use colored::*;
use flowsweep_domain::retention::PRESETS;
use flowsweep_domain::{BackupRecord, CleanupReport, TableDeletion, TableDescriptor};
use flowsweep_janitor::{DatabaseSnapshot, HealthStatus, TableCount};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Output format in use.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a database snapshot with its health classification.
    pub fn snapshot(&self, snapshot: &DatabaseSnapshot, health: HealthStatus, recommendation: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "taken_at": snapshot.taken_at,
                "counts": snapshot.counts,
                "total_rows": snapshot.total_rows(),
                "size_bytes": snapshot.size_bytes,
                "status": health,
                "recommendation": recommendation,
            }))?),
            OutputFormat::Quiet => Ok(health.to_string()),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Table", "Rows"]);
                for (table, count) in &snapshot.counts {
                    let rows = match count {
                        TableCount::Rows(n) => group_digits(*n),
                        TableCount::Unavailable(reason) => format!("unavailable ({})", reason),
                    };
                    builder.push_record([table.as_str(), rows.as_str()]);
                }
                builder.push_record(["Total", group_digits(snapshot.total_rows()).as_str()]);

                let size = snapshot
                    .size_mb()
                    .map(|mb| format!("{:.2} MB", mb))
                    .unwrap_or_else(|| "unknown".to_string());

                Ok(format!(
                    "{}\n\nDatabase size: {}\nStatus: {}\nRecommendation: {}",
                    self.table(builder),
                    size,
                    self.health(health),
                    recommendation
                ))
            }
        }
    }

    /// Format the outcome of a cleanup run.
    pub fn cleanup_report(&self, report: &CleanupReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "dry_run": report.is_dry_run(),
                "cutoff": report.cutoff(),
                "retention_days": report.retention_days(),
                "deleted": deletions_json(report.deletions()),
                "total_deleted": report.total_deleted(),
                "elapsed_secs": report.elapsed().as_secs_f64(),
                "backup": report.backup().map(|b| b.path.display().to_string()),
            }))?),
            OutputFormat::Quiet => Ok(report.total_deleted().to_string()),
            OutputFormat::Table => {
                let mut lines = Vec::new();
                if let Some(backup) = report.backup() {
                    lines.push(self.success(&format!("Backup created: {}", backup.path.display())));
                }
                lines.push(self.deletions(report.deletions(), report.is_dry_run()));

                let summary = if report.is_dry_run() {
                    self.warning(&format!(
                        "Dry run: {} rows older than {} days would be deleted",
                        group_digits(report.total_deleted()),
                        report.retention_days()
                    ))
                } else {
                    self.success(&format!(
                        "Deleted {} rows older than {} days in {:.2}s",
                        group_digits(report.total_deleted()),
                        report.retention_days(),
                        report.elapsed().as_secs_f64()
                    ))
                };
                lines.push(summary);
                Ok(lines.join("\n"))
            }
        }
    }

    /// Table of per-table counts in deletion order.
    pub fn deletions(&self, deletions: &[TableDeletion], dry_run: bool) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Table", if dry_run { "Would delete" } else { "Deleted" }]);
        for deletion in deletions {
            builder.push_record([deletion.table.as_str(), group_digits(deletion.rows).as_str()]);
        }
        self.table(builder)
    }

    /// Format a list of backups.
    pub fn backups(&self, records: &[BackupRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = records.iter().map(backup_json).collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(records
                .iter()
                .map(|r| r.path.display().to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if records.is_empty() {
                    return Ok(self.colorize("No backups found.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Name", "Created (UTC)", "Size", "Path"]);
                for record in records {
                    builder.push_record([
                        record.name.clone(),
                        format_time(record),
                        format!("{:.2} MB", record.size_mb()),
                        record.path.display().to_string(),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format a single backup that was just created.
    pub fn backup_created(&self, record: &BackupRecord) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&backup_json(record))?),
            OutputFormat::Quiet => Ok(record.path.display().to_string()),
            OutputFormat::Table => Ok(self.success(&format!(
                "Backup created: {} ({:.2} MB)",
                record.path.display(),
                record.size_mb()
            ))),
        }
    }

    /// Format the deletion order.
    pub fn deletion_order(&self, order: &[&TableDescriptor]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = order
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "table": t.name(),
                            "timestamp_column": t.timestamp_column(),
                            "references": t.parents().collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(order.iter().map(|t| t.name()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["#", "Table", "Column", "References"]);
                for (i, table) in order.iter().enumerate() {
                    builder.push_record([
                        (i + 1).to_string(),
                        table.name().to_string(),
                        table.timestamp_column().to_string(),
                        table.parents().collect::<Vec<_>>().join(", "),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format the retention presets.
    pub fn policies(&self) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<serde_json::Value> = PRESETS
                    .iter()
                    .map(|(name, days)| serde_json::json!({ "name": name, "days": days }))
                    .collect();
                Ok(serde_json::to_string_pretty(&json)?)
            }
            OutputFormat::Quiet => Ok(PRESETS.iter().map(|(name, _)| *name).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Policy", "Days kept"]);
                for (name, days) in PRESETS {
                    builder.push_record([name.to_string(), days.to_string()]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn health(&self, health: HealthStatus) -> String {
        let label = health.as_str().to_uppercase();
        match health {
            HealthStatus::Ok => self.colorize(&label, "green"),
            HealthStatus::AttentionNeeded => self.colorize(&label, "yellow"),
            HealthStatus::Critical => self.colorize(&label, "red"),
        }
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn deletions_json(deletions: &[TableDeletion]) -> serde_json::Value {
    deletions
        .iter()
        .map(|d| (d.table.clone(), serde_json::Value::from(d.rows)))
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn backup_json(record: &BackupRecord) -> serde_json::Value {
    serde_json::json!({
        "name": record.name,
        "path": record.path.display().to_string(),
        "created_at": format_time(record),
        "source": record.source,
        "size_bytes": record.size_bytes,
    })
}

fn format_time(record: &BackupRecord) -> String {
    DateTime::<Utc>::from(record.created_at)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// `1234567` -> `1,234,567`
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

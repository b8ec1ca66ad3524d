//! Backup handler: create, list, prune, verify and restore artifacts

use crate::strategy::{strategy_for, BackupStrategy};
use crate::{BackupConfig, BackupError};
use chrono::{DateTime, NaiveDateTime, Utc};
use flowsweep_domain::{BackupRecord, DatabaseTarget};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension of finished backup artifacts
pub const BACKUP_EXTENSION: &str = "backup";

/// Timestamp layout embedded in generated backup names
const NAME_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// Length of a rendered [`NAME_TIMESTAMP_FORMAT`]
const NAME_TIMESTAMP_LEN: usize = 19;

/// Creates and manages backups for one database
///
/// # Examples
///
/// ```no_run
/// use flowsweep_backup::{BackupConfig, BackupHandler};
/// use flowsweep_domain::DatabaseTarget;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let target = DatabaseTarget::parse("sqlite:///prefect.db")?;
/// let handler = BackupHandler::new(&target, BackupConfig::default())?;
///
/// let record = handler.create()?;
/// println!("Backup created: {}", record.path.display());
///
/// handler.cleanup_old_backups(5)?;
/// # Ok(())
/// # }
/// ```
pub struct BackupHandler {
    config: BackupConfig,
    strategy: Box<dyn BackupStrategy>,
}

impl BackupHandler {
    /// Handler for `target`, using the strategy its capability declares
    pub fn new(target: &DatabaseTarget, config: BackupConfig) -> Result<Self, BackupError> {
        let strategy = strategy_for(target, &config)?;
        Ok(Self::with_strategy(strategy, config))
    }

    /// Handler with an explicit strategy
    pub fn with_strategy(strategy: Box<dyn BackupStrategy>, config: BackupConfig) -> Self {
        Self { config, strategy }
    }

    /// Directory holding the artifacts
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Configuration in use
    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Create a backup named `<prefix>_<timestamp>`
    ///
    /// # Errors
    ///
    /// [`BackupError`] if the source is unreachable, the directory is not
    /// writable, or the snapshot fails verification. Nothing is left behind
    /// under the final artifact name on failure.
    pub fn create(&self) -> Result<BackupRecord, BackupError> {
        self.create_at(SystemTime::now(), None)
    }

    /// Create a backup with an explicit name
    pub fn create_named(&self, name: &str) -> Result<BackupRecord, BackupError> {
        validate_name(name)?;
        self.create_at(SystemTime::now(), Some(name))
    }

    pub(crate) fn create_at(&self, now: SystemTime, name: Option<&str>) -> Result<BackupRecord, BackupError> {
        let dir = &self.config.directory;
        fs::create_dir_all(dir).map_err(|e| BackupError::NotWritable {
            path: dir.clone(),
            source: e,
        })?;

        let base = match name {
            Some(name) => name.to_string(),
            None => {
                let stamp = DateTime::<Utc>::from(now).format(NAME_TIMESTAMP_FORMAT);
                format!("{}_{}", self.config.prefix, stamp)
            }
        };
        let name = self.unused_name(&base);
        let path = self.artifact_path(&name);
        let staging = staging_path(&path);

        tracing::info!("Creating backup {} of {}", path.display(), self.strategy.source());

        if let Err(e) = self.strategy.snapshot(&staging) {
            discard(&staging);
            tracing::error!("Backup failed: {}", e);
            return Err(e);
        }

        fs::rename(&staging, &path).map_err(|e| {
            discard(&staging);
            BackupError::NotWritable {
                path: path.clone(),
                source: e,
            }
        })?;

        let record = BackupRecord {
            size_bytes: fs::metadata(&path)?.len(),
            name,
            path,
            created_at: now,
            source: self.strategy.source(),
        };
        tracing::info!("Backup created: {} ({} bytes)", record.path.display(), record.size_bytes);
        Ok(record)
    }

    /// First of `base`, `base_1`, `base_2`, ... with no artifact on disk
    fn unused_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while self.artifact_path(&name).exists() {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        name
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.config.directory.join(format!("{}.{}", name, BACKUP_EXTENSION))
    }

    /// All backups, newest first
    ///
    /// A missing directory means no backups.
    pub fn list_backups(&self) -> Result<Vec<BackupRecord>, BackupError> {
        let dir = &self.config.directory;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == BACKUP_EXTENSION) {
                records.push(self.record_for(&path)?);
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));
        Ok(records)
    }

    fn record_for(&self, path: &Path) -> Result<BackupRecord, BackupError> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created_at = match self.parse_name_timestamp(&name) {
            Some(created_at) => created_at,
            None => metadata.modified()?,
        };
        Ok(BackupRecord {
            name,
            path: path.to_path_buf(),
            created_at,
            source: self.strategy.source(),
            size_bytes: metadata.len(),
        })
    }

    /// Creation time embedded in a generated name
    fn parse_name_timestamp(&self, name: &str) -> Option<SystemTime> {
        let stamp = name.strip_prefix(&self.config.prefix)?.strip_prefix('_')?;
        let stamp = stamp.get(..NAME_TIMESTAMP_LEN)?;
        let parsed = NaiveDateTime::parse_from_str(stamp, NAME_TIMESTAMP_FORMAT).ok()?;
        Some(SystemTime::from(parsed.and_utc()))
    }

    /// Find a backup by name, or by path to an artifact
    pub fn find(&self, name_or_path: &str) -> Result<BackupRecord, BackupError> {
        let as_path = Path::new(name_or_path);
        if as_path.is_file() {
            return self.record_for(as_path);
        }
        self.list_backups()?
            .into_iter()
            .find(|r| r.name == name_or_path)
            .ok_or_else(|| BackupError::NotFound(name_or_path.to_string()))
    }

    /// Delete all but the `keep` most recent backups
    ///
    /// Returns the number of artifacts deleted; a no-op when `keep` or fewer
    /// exist.
    ///
    /// # Errors
    ///
    /// [`BackupError::InvalidArgument`] if `keep` is negative.
    pub fn cleanup_old_backups(&self, keep: i64) -> Result<usize, BackupError> {
        if keep < 0 {
            return Err(BackupError::InvalidArgument(format!(
                "keep must be >= 0, got {}",
                keep
            )));
        }

        let backups = self.list_backups()?;
        let keep = usize::try_from(keep).unwrap_or(usize::MAX);
        let mut deleted = 0;
        for record in backups.iter().skip(keep) {
            fs::remove_file(&record.path)?;
            tracing::info!("Deleted old backup: {}", record.path.display());
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Check an artifact with the strategy's verification
    pub fn verify(&self, record: &BackupRecord) -> Result<(), BackupError> {
        self.strategy.verify(&record.path)
    }

    /// Replace the whole database with `record`
    ///
    /// Close every connection to the database first.
    pub fn restore(&self, record: &BackupRecord) -> Result<(), BackupError> {
        tracing::info!("Restoring {} from {}", self.strategy.source(), record.path.display());
        self.strategy.restore(&record.path)?;
        tracing::info!("Restore complete");
        Ok(())
    }
}

/// `<name>.backup.tmp`, next to the final artifact
fn staging_path(artifact: &Path) -> PathBuf {
    let mut staging = artifact.as_os_str().to_os_string();
    staging.push(".tmp");
    PathBuf::from(staging)
}

/// Remove a failed staging file along with any journal SQLite left next to it
fn discard(staging: &Path) {
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let mut path = staging.as_os_str().to_os_string();
        path.push(suffix);
        let _ = fs::remove_file(PathBuf::from(path));
    }
}

fn validate_name(name: &str) -> Result<(), BackupError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(BackupError::InvalidArgument(format!("invalid backup name '{}'", name)));
    }
    Ok(())
}

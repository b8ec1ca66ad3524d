//! Backup strategies
//!
//! Exactly two implementations exist, one per [`BackupCapability`]:
//! [`FileSnapshot`] copies a SQLite database through the online backup API,
//! [`DumpRestore`] shells out to a dump utility. [`strategy_for`] picks one
//! from the target's declared capability.

use crate::{BackupConfig, BackupError};
use flowsweep_domain::{BackupCapability, DatabaseTarget};
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// First 16 bytes of every SQLite database file
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// How long a snapshot or restore waits on a competing lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine-specific way of snapshotting and restoring a database
pub trait BackupStrategy: Send + Sync {
    /// Capability this strategy implements
    fn capability(&self) -> BackupCapability;

    /// Identity of the source database (credentials redacted)
    fn source(&self) -> String;

    /// Write a complete snapshot to `dest`
    ///
    /// `dest` is a temporary path; the handler renames it into place once this
    /// returns successfully.
    fn snapshot(&self, dest: &Path) -> Result<(), BackupError>;

    /// Check that `artifact` looks like a complete snapshot
    fn verify(&self, artifact: &Path) -> Result<(), BackupError>;

    /// Replace the whole database with the contents of `artifact`
    fn restore(&self, artifact: &Path) -> Result<(), BackupError>;
}

/// Pick the strategy matching the target's capability
pub fn strategy_for(target: &DatabaseTarget, config: &BackupConfig) -> Result<Box<dyn BackupStrategy>, BackupError> {
    match (target.capability(), target) {
        (BackupCapability::FileSnapshot, DatabaseTarget::Sqlite { path }) => {
            if target.is_in_memory() {
                return Err(BackupError::SourceUnavailable(
                    "in-memory databases cannot be backed up".to_string(),
                ));
            }
            Ok(Box::new(FileSnapshot::new(path.clone())))
        }
        (BackupCapability::DumpRestore, DatabaseTarget::Postgres { url }) => Ok(Box::new(DumpRestore::new(
            url.clone(),
            target.identity(),
            config.dump_program.clone(),
            config.restore_program.clone(),
        ))),
        (capability, _) => Err(BackupError::SourceUnavailable(format!(
            "{:?} is not supported for {}",
            capability,
            target.identity()
        ))),
    }
}

fn artifact_len(artifact: &Path) -> Result<u64, BackupError> {
    let metadata = fs::metadata(artifact)
        .map_err(|e| BackupError::Verification(format!("{}: {}", artifact.display(), e)))?;
    if metadata.len() == 0 {
        return Err(BackupError::Verification(format!("{} is empty", artifact.display())));
    }
    Ok(metadata.len())
}

/// Snapshot of a file-backed (SQLite) database
///
/// Pages are copied through SQLite's online backup API, so committed
/// transactions still sitting in the `-wal` file are included and a
/// concurrent writer cannot tear the copy.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    db_path: PathBuf,
}

impl FileSnapshot {
    /// Strategy for the database file at `db_path`
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Database file being snapshotted
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl BackupStrategy for FileSnapshot {
    fn capability(&self) -> BackupCapability {
        BackupCapability::FileSnapshot
    }

    fn source(&self) -> String {
        format!("sqlite:///{}", self.db_path.display())
    }

    fn snapshot(&self, dest: &Path) -> Result<(), BackupError> {
        if !self.db_path.is_file() {
            return Err(BackupError::SourceUnavailable(format!(
                "database file not found: {}",
                self.db_path.display()
            )));
        }

        let source = Connection::open_with_flags(&self.db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| BackupError::SourceUnavailable(format!("{}: {}", self.db_path.display(), e)))?;
        source.busy_timeout(BUSY_TIMEOUT)?;
        source.backup(DatabaseName::Main, dest, None)?;
        drop(source);

        // The copied header keeps the source's journal mode; switch the
        // artifact to a rollback journal so it is a single self-contained file
        let artifact = Connection::open(dest)?;
        let mode: String =
            artifact.pragma_update_and_check(None, "journal_mode", "DELETE", |row| row.get(0))?;
        tracing::debug!("Snapshot {} written in {} journal mode", dest.display(), mode);
        drop(artifact);

        self.verify(dest)
    }

    fn verify(&self, artifact: &Path) -> Result<(), BackupError> {
        artifact_len(artifact)?;
        let mut header = [0u8; 16];
        fs::File::open(artifact)?
            .read_exact(&mut header)
            .map_err(|e| BackupError::Verification(format!("{}: {}", artifact.display(), e)))?;
        if &header != SQLITE_HEADER {
            return Err(BackupError::Verification(format!(
                "{} is not a SQLite database",
                artifact.display()
            )));
        }
        Ok(())
    }

    fn restore(&self, artifact: &Path) -> Result<(), BackupError> {
        self.verify(artifact)?;

        // Pages go through the live database's own locking and journal, so
        // the file is never replaced underneath another connection
        let mut conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.restore(DatabaseName::Main, artifact, None::<fn(Progress)>)?;
        Ok(())
    }
}

/// Dump-based backup of a server-backed (PostgreSQL) database
#[derive(Debug, Clone)]
pub struct DumpRestore {
    url: String,
    identity: String,
    dump_program: String,
    restore_program: String,
}

impl DumpRestore {
    /// Strategy invoking `dump_program` / `restore_program` against `url`
    pub fn new(url: String, identity: String, dump_program: String, restore_program: String) -> Self {
        Self {
            url,
            identity,
            dump_program,
            restore_program,
        }
    }

    fn run(&self, program: &str, command: &mut Command) -> Result<(), BackupError> {
        let output = command.output().map_err(|e| BackupError::DumpFailed {
            program: program.to_string(),
            status: "failed to start".to_string(),
            stderr: e.to_string(),
        })?;

        if !output.status.success() {
            return Err(BackupError::DumpFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl BackupStrategy for DumpRestore {
    fn capability(&self) -> BackupCapability {
        BackupCapability::DumpRestore
    }

    fn source(&self) -> String {
        self.identity.clone()
    }

    fn snapshot(&self, dest: &Path) -> Result<(), BackupError> {
        // --clean lets the plain-SQL dump replace existing objects on restore
        self.run(
            &self.dump_program,
            Command::new(&self.dump_program)
                .arg("--clean")
                .arg("--if-exists")
                .arg("--file")
                .arg(dest)
                .arg(&self.url),
        )?;
        self.verify(dest)
    }

    fn verify(&self, artifact: &Path) -> Result<(), BackupError> {
        artifact_len(artifact).map(|_| ())
    }

    fn restore(&self, artifact: &Path) -> Result<(), BackupError> {
        self.verify(artifact)?;
        self.run(
            &self.restore_program,
            Command::new(&self.restore_program)
                .arg("--quiet")
                .arg("--set")
                .arg("ON_ERROR_STOP=1")
                .arg("--file")
                .arg(artifact)
                .arg(&self.url),
        )
    }
}

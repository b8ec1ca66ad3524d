//! flowsweep Storage Layer
//!
//! Implements the `ReadStore` and `PurgeStore` traits on top of SQLite.
//!
//! # Architecture
//!
//! - One `rusqlite::Connection` per store; not shared between threads
//! - Foreign keys are enforced, so a wrong deletion order fails loudly
//! - Purges run inside `BEGIN IMMEDIATE`, which holds the database write lock
//!   for the whole run and keeps concurrent cleanups from interleaving
//!
//! # Timestamps
//!
//! Prefect stores timestamps in SQLite as UTC text
//! (`YYYY-MM-DD HH:MM:SS.ffffff`). The cutoff is encoded the same way and
//! compared with `<`, which orders correctly for that layout. Databases that
//! store epoch seconds can switch to [`TimestampEncoding::UnixSeconds`].
//!
//! # Examples
//!
//! ```no_run
//! use flowsweep_domain::ReadStore;
//! use flowsweep_store::SqliteStore;
//!
//! let store = SqliteStore::open_read_only("prefect.db").unwrap();
//! println!("{} log rows", store.count_rows("log").unwrap());
//! ```

#![warn(missing_docs)]

use flowsweep_domain::schema::is_identifier;
use flowsweep_domain::{PurgeStore, ReadStore, Timestamp};
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How long a connection waits for a competing writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Layout of timestamps produced by [`format_timestamp`]
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Table or column name that cannot be interpolated safely
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Transaction calls out of sequence
    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// Representation of timestamp columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampEncoding {
    /// UTC text, `YYYY-MM-DD HH:MM:SS.ffffff` (Prefect's layout)
    #[default]
    Text,
    /// Integer seconds since the Unix epoch
    UnixSeconds,
}

/// Format epoch seconds the way Prefect stores timestamps in SQLite
pub fn format_timestamp(ts: Timestamp) -> Result<String, StoreError> {
    let secs = i64::try_from(ts).map_err(|_| StoreError::InvalidData(format!("timestamp {} out of range", ts)))?;
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp {} out of range", ts)))
}

/// Quote a validated identifier for interpolation into SQL
fn quote(ident: &str) -> Result<String, StoreError> {
    if !is_identifier(ident) {
        return Err(StoreError::InvalidIdentifier(ident.to_string()));
    }
    Ok(format!("\"{}\"", ident))
}

/// SQLite-backed store for cleanup and monitoring
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// `SqliteStore` instance.
pub struct SqliteStore {
    conn: Connection,
    encoding: TimestampEncoding,
    in_transaction: bool,
}

impl SqliteStore {
    /// Open an existing database for reading and writing
    ///
    /// Fails if the file does not exist; cleanup never creates databases.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::from_connection(Connection::open_with_flags(path, flags)?)
    }

    /// Open an existing database read-only (used by the monitor)
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::from_connection(Connection::open_with_flags(path, flags)?)
    }

    /// Create (or open) a database file and make sure the Prefect tables exist
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let store = Self::from_connection(Connection::open(path)?)?;
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory database with the Prefect tables (useful for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self::from_connection(Connection::open_in_memory()?)?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(Self {
            conn,
            encoding: TimestampEncoding::default(),
            in_transaction: false,
        })
    }

    /// Use a different timestamp encoding for cutoff comparisons
    pub fn with_encoding(mut self, encoding: TimestampEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Timestamp encoding in use
    pub fn encoding(&self) -> TimestampEncoding {
        self.encoding
    }

    /// Create the Prefect tables if they are missing
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("prefect_schema.sql"))?;
        Ok(())
    }

    /// Underlying connection, for seeding and inspection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// True between `begin` and `commit`/`rollback`
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Encode a timestamp the way rows in this database are stored
    pub fn encode_timestamp(&self, ts: Timestamp) -> Result<Value, StoreError> {
        match self.encoding {
            TimestampEncoding::Text => Ok(Value::Text(format_timestamp(ts)?)),
            TimestampEncoding::UnixSeconds => i64::try_from(ts)
                .map(Value::Integer)
                .map_err(|_| StoreError::InvalidData(format!("timestamp {} out of range", ts))),
        }
    }
}

impl ReadStore for SqliteStore {
    type Error = StoreError;

    fn count_rows(&self, table: &str) -> Result<u64, Self::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote(table)?);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_older_than(&self, table: &str, column: &str, cutoff: Timestamp) -> Result<u64, Self::Error> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} < ?1", quote(table)?, quote(column)?);
        let count: i64 = self.conn.query_row(&sql, [self.encode_timestamp(cutoff)?], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn size_bytes(&self) -> Result<Option<u64>, Self::Error> {
        let page_count: i64 = self.conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = self.conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        if page_count <= 0 || page_size <= 0 {
            return Ok(None);
        }
        Ok(Some(page_count as u64 * page_size as u64))
    }
}

impl PurgeStore for SqliteStore {
    fn begin(&mut self) -> Result<(), Self::Error> {
        if self.in_transaction {
            return Err(StoreError::Transaction("transaction already open".to_string()));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn delete_older_than(&mut self, table: &str, column: &str, cutoff: Timestamp) -> Result<u64, Self::Error> {
        if !self.in_transaction {
            return Err(StoreError::Transaction("delete outside of a transaction".to_string()));
        }
        let sql = format!("DELETE FROM {} WHERE {} < ?1", quote(table)?, quote(column)?);
        let deleted = self.conn.execute(&sql, [self.encode_timestamp(cutoff)?])?;
        Ok(deleted as u64)
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        if !self.in_transaction {
            return Err(StoreError::Transaction("no transaction to commit".to_string()));
        }
        // On failure the transaction stays open so the caller can roll back
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        if !self.in_transaction {
            return Err(StoreError::Transaction("no transaction to roll back".to_string()));
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0).unwrap(), "1970-01-01 00:00:00.000000");
        assert_eq!(format_timestamp(1_700_000_000).unwrap(), "2023-11-14 22:13:20.000000");
        assert!(format_timestamp(u64::MAX).is_err());
    }

    #[test]
    fn test_quote_rejects_injection() {
        assert_eq!(quote("log").unwrap(), "\"log\"");
        assert!(matches!(quote("log\"; DROP TABLE log; --"), Err(StoreError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_encode_timestamp() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(
            store.encode_timestamp(0).unwrap(),
            Value::Text("1970-01-01 00:00:00.000000".to_string())
        );

        let store = store.with_encoding(TimestampEncoding::UnixSeconds);
        assert_eq!(store.encoding(), TimestampEncoding::UnixSeconds);
        assert_eq!(store.encode_timestamp(42).unwrap(), Value::Integer(42));
    }

    #[test]
    fn test_transaction_sequencing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.delete_older_than("log", "created", 0),
            Err(StoreError::Transaction(_))
        ));
        assert!(store.commit().is_err());

        store.begin().unwrap();
        assert!(store.in_transaction());
        assert!(store.begin().is_err());
        store.rollback().unwrap();
        assert!(!store.in_transaction());
    }
}

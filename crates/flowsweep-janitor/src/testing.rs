//! In-memory store for unit tests

use flowsweep_domain::{PurgeStore, ReadStore, Timestamp};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("{0}")]
pub(crate) struct MemoryError(String);

/// Tables of row timestamps, with snapshot-based transactions
///
/// Every row is 64 bytes for the purposes of `size_bytes`.
pub(crate) struct MemoryStore {
    tables: BTreeMap<String, Vec<Timestamp>>,
    saved: Option<BTreeMap<String, Vec<Timestamp>>>,
    fail_on: Option<String>,
    deleted_from: Vec<String>,
}

impl MemoryStore {
    pub(crate) fn new<'a>(tables: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.to_string(), Vec::new())).collect(),
            saved: None,
            fail_on: None,
            deleted_from: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, table: &str, created: Timestamp) {
        if let Some(rows) = self.tables.get_mut(table) {
            rows.push(created);
        }
    }

    /// Make every delete from `table` fail
    pub(crate) fn fail_on(&mut self, table: &str) {
        self.fail_on = Some(table.to_string());
    }

    /// Tables deleted from by committed or open transactions, in call order
    pub(crate) fn delete_log(&self) -> Vec<String> {
        self.deleted_from.clone()
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.saved.is_some()
    }

    fn rows(&self, table: &str) -> Result<&Vec<Timestamp>, MemoryError> {
        self.tables
            .get(table)
            .ok_or_else(|| MemoryError(format!("no such table: {}", table)))
    }
}

impl ReadStore for MemoryStore {
    type Error = MemoryError;

    fn count_rows(&self, table: &str) -> Result<u64, Self::Error> {
        Ok(self.rows(table)?.len() as u64)
    }

    fn count_older_than(&self, table: &str, _column: &str, cutoff: Timestamp) -> Result<u64, Self::Error> {
        Ok(self.rows(table)?.iter().filter(|ts| **ts < cutoff).count() as u64)
    }

    fn size_bytes(&self) -> Result<Option<u64>, Self::Error> {
        Ok(Some(self.tables.values().map(|rows| rows.len() as u64 * 64).sum()))
    }
}

impl PurgeStore for MemoryStore {
    fn begin(&mut self) -> Result<(), Self::Error> {
        if self.saved.is_some() {
            return Err(MemoryError("transaction already open".to_string()));
        }
        self.saved = Some(self.tables.clone());
        Ok(())
    }

    fn delete_older_than(&mut self, table: &str, _column: &str, cutoff: Timestamp) -> Result<u64, Self::Error> {
        if self.saved.is_none() {
            return Err(MemoryError("delete outside of a transaction".to_string()));
        }
        if self.fail_on.as_deref() == Some(table) {
            return Err(MemoryError(format!("injected failure on {}", table)));
        }
        let rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| MemoryError(format!("no such table: {}", table)))?;
        let before = rows.len();
        rows.retain(|ts| *ts >= cutoff);
        self.deleted_from.push(table.to_string());
        Ok((before - rows.len()) as u64)
    }

    fn commit(&mut self) -> Result<(), Self::Error> {
        self.saved
            .take()
            .map(|_| ())
            .ok_or_else(|| MemoryError("no transaction to commit".to_string()))
    }

    fn rollback(&mut self) -> Result<(), Self::Error> {
        let saved = self
            .saved
            .take()
            .ok_or_else(|| MemoryError("no transaction to roll back".to_string()))?;
        self.tables = saved;
        Ok(())
    }
}

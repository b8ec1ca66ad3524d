//! Trait definitions for the database collaborator
//!
//! These traits define the boundary between the cleanup logic and the
//! database engine. Implementations live in `flowsweep-store`.
//!
//! Table and column names passed to these methods come from a validated
//! [`SchemaModel`](crate::SchemaModel) and are plain identifiers.

use crate::Timestamp;

/// Read-only access used by the monitor
///
/// Nothing reachable through this trait may modify data.
pub trait ReadStore {
    /// Error type for store operations
    type Error;

    /// Number of rows in `table`
    fn count_rows(&self, table: &str) -> Result<u64, Self::Error>;

    /// Rows whose `column` is strictly older than `cutoff`
    fn count_older_than(&self, table: &str, column: &str, cutoff: Timestamp) -> Result<u64, Self::Error>;

    /// Estimated size of the database in bytes, if the engine can tell
    fn size_bytes(&self) -> Result<Option<u64>, Self::Error>;
}

/// Transactional delete access used by the cleanup engine
///
/// Callers pair every successful `begin` with exactly one `commit` or
/// `rollback`.
pub trait PurgeStore: ReadStore {
    /// Open a write transaction covering every following delete
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Delete rows whose `column` is strictly older than `cutoff`, returning
    /// the number removed
    fn delete_older_than(&mut self, table: &str, column: &str, cutoff: Timestamp) -> Result<u64, Self::Error>;

    /// Make every delete since `begin` durable
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Discard every delete since `begin`
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

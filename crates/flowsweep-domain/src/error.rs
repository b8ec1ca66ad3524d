//! Error types for domain validation

use thiserror::Error;

/// Errors raised while building or ordering a schema model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The foreign-key graph has a cycle, so no deletion order exists
    #[error("Cyclic dependency between tables: {}", tables.join(", "))]
    CyclicDependency {
        /// Tables that could not be ordered (sorted by name)
        tables: Vec<String>,
    },

    /// A table references a table that is not part of the model
    #[error("Table '{table}' references unknown table '{parent}'")]
    UnknownTable {
        /// Referencing table
        table: String,
        /// Missing parent
        parent: String,
    },

    /// Two descriptors share a name
    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),

    /// Not a plain SQL identifier
    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),
}

/// Malformed retention input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Negative day count, unknown preset name, or unparsable input
    #[error("Invalid retention policy: {0}")]
    InvalidPolicy(String),
}

/// Database URL that cannot be mapped to a supported engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// Scheme is neither SQLite nor PostgreSQL
    #[error("Unsupported database URL scheme '{0}'")]
    UnsupportedScheme(String),

    /// URL has no usable location
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

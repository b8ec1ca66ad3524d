//! Database targets and their declared backup capability
//!
//! Accepts the URL forms Prefect uses (`sqlite+aiosqlite:///...`,
//! `postgresql+asyncpg://...`) as well as plain `sqlite://` /
//! `postgresql://` URLs and bare file paths.

use crate::TargetError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a target can be snapshotted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupCapability {
    /// File-backed engine: copy the database file
    FileSnapshot,
    /// Server-backed engine: run an external dump utility
    DumpRestore,
}

/// Database being cleaned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// SQLite database file (`:memory:` for an in-memory database)
    Sqlite {
        /// Database file path
        path: PathBuf,
    },
    /// PostgreSQL server
    Postgres {
        /// libpq-compatible connection URL (driver suffix removed)
        url: String,
    },
}

impl DatabaseTarget {
    /// Parse a connection URL or bare SQLite path
    ///
    /// # Examples
    ///
    /// ```
    /// use flowsweep_domain::{BackupCapability, DatabaseTarget};
    ///
    /// let target = DatabaseTarget::parse("sqlite+aiosqlite:////var/lib/prefect.db").unwrap();
    /// assert_eq!(target.sqlite_path().unwrap().to_str(), Some("/var/lib/prefect.db"));
    /// assert_eq!(target.capability(), BackupCapability::FileSnapshot);
    ///
    /// let target = DatabaseTarget::parse("postgresql+asyncpg://prefect:s3cret@db:5432/prefect").unwrap();
    /// assert_eq!(target.identity(), "postgresql://prefect:***@db:5432/prefect");
    /// ```
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(TargetError::InvalidUrl("empty database URL".to_string()));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Ok(Self::Sqlite {
                path: PathBuf::from(url),
            });
        };

        // SQLAlchemy style: dialect[+driver]
        let dialect = scheme.split('+').next().unwrap_or(scheme).to_lowercase();
        match dialect.as_str() {
            "sqlite" => {
                let location = rest.split('?').next().unwrap_or(rest);
                // sqlite:///relative.db -> "relative.db", sqlite:////abs.db -> "/abs.db"
                let location = location.strip_prefix('/').unwrap_or(location);
                let path = if location.is_empty() { ":memory:" } else { location };
                Ok(Self::Sqlite {
                    path: PathBuf::from(path),
                })
            }
            "postgres" | "postgresql" => {
                if rest.is_empty() {
                    return Err(TargetError::InvalidUrl(url.to_string()));
                }
                Ok(Self::Postgres {
                    url: format!("postgresql://{}", rest),
                })
            }
            _ => Err(TargetError::UnsupportedScheme(scheme.to_string())),
        }
    }

    /// Backup strategy the engine supports
    pub fn capability(&self) -> BackupCapability {
        match self {
            Self::Sqlite { .. } => BackupCapability::FileSnapshot,
            Self::Postgres { .. } => BackupCapability::DumpRestore,
        }
    }

    /// SQLite file path, if this is a SQLite target
    pub fn sqlite_path(&self) -> Option<&Path> {
        match self {
            Self::Sqlite { path } => Some(path),
            Self::Postgres { .. } => None,
        }
    }

    /// True for `:memory:` SQLite targets, which have no file to back up
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::Sqlite { path } if path.as_os_str() == ":memory:")
    }

    /// Printable identity with any password replaced by `***`
    pub fn identity(&self) -> String {
        match self {
            Self::Sqlite { path } => format!("sqlite:///{}", path.display()),
            Self::Postgres { url } => redact_password(url),
        }
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

impl FromStr for DatabaseTarget {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn redact_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => match userinfo.split_once(':') {
            Some((user, _password)) => format!("{}://{}:***@{}{}", scheme, user, host, tail),
            None => url.to_string(),
        },
        None => url.to_string(),
    }
}

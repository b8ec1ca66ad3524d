//! Command implementations.

pub mod backup;
pub mod cleanup;
pub mod order;
pub mod policies;
pub mod status;
pub mod watch;

pub use self::backup::execute_backup;
pub use self::cleanup::execute_cleanup;
pub use self::order::execute_order;
pub use self::policies::execute_policies;
pub use self::status::execute_status;
pub use self::watch::execute_watch;

use crate::config::Config;
use crate::error::{CliError, Result};
use flowsweep_backup::BackupHandler;
use flowsweep_domain::DatabaseTarget;
use flowsweep_store::SqliteStore;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Path of a SQLite target; row-level work is SQLite-only.
fn sqlite_path<'a>(target: &'a DatabaseTarget, operation: &str) -> Result<&'a Path> {
    target.sqlite_path().ok_or_else(|| {
        CliError::Unsupported(format!(
            "{} needs a SQLite database; {} only supports backup and restore",
            operation,
            target.identity()
        ))
    })
}

/// Open the database for cleanup.
pub(crate) fn open_store(target: &DatabaseTarget, config: &Config, operation: &str) -> Result<SqliteStore> {
    let path = sqlite_path(target, operation)?;
    Ok(SqliteStore::open(path)?.with_encoding(config.database.timestamp_encoding))
}

/// Open the database without write access.
pub(crate) fn open_read_only(target: &DatabaseTarget, config: &Config, operation: &str) -> Result<SqliteStore> {
    let path = sqlite_path(target, operation)?;
    Ok(SqliteStore::open_read_only(path)?.with_encoding(config.database.timestamp_encoding))
}

/// Backup handler for the target, using the configured directory.
pub(crate) fn backup_handler(target: &DatabaseTarget, config: &Config) -> Result<BackupHandler> {
    Ok(BackupHandler::new(target, config.backup.clone())?)
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` is no.
pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    confirm_with(io::stdin().lock(), prompt)
}

pub(crate) fn confirm_with(mut input: impl BufRead, prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut response = String::new();
    input.read_line(&mut response)?;
    let response = response.trim();
    Ok(response.eq_ignore_ascii_case("y") || response.eq_ignore_ascii_case("yes"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_confirm_answers() {
        assert!(confirm_with(Cursor::new("y\n"), "Continue?").unwrap());
        assert!(confirm_with(Cursor::new("YES\n"), "Continue?").unwrap());
        assert!(!confirm_with(Cursor::new("n\n"), "Continue?").unwrap());
        assert!(!confirm_with(Cursor::new(""), "Continue?").unwrap());
    }

    #[test]
    fn test_postgres_has_no_row_access() {
        let target = DatabaseTarget::parse("postgresql://prefect@db/prefect").unwrap();
        let result = open_store(&target, &Config::default(), "cleanup");
        assert!(matches!(result, Err(CliError::Unsupported(_))));
    }
}

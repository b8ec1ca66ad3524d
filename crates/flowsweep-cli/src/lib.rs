//! flowsweep CLI library.
//!
//! This library provides the core functionality for the flowsweep command-line interface,
//! including configuration management, command execution, and output formatting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, CliFormat, Command};
pub use config::{Config, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

/// Log filter for `-v` occurrences, used when `RUST_LOG` is unset.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(log_filter(0), "warn");
        assert_eq!(log_filter(1), "info");
        assert_eq!(log_filter(5), "debug");
    }

    #[test]
    fn test_format_conversion() {
        assert_eq!(OutputFormat::from(CliFormat::Json), OutputFormat::Json);
        assert_eq!(OutputFormat::from(CliFormat::Quiet), OutputFormat::Quiet);
    }
}

//! Status command implementation.

use super::open_read_only;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use flowsweep_domain::{DatabaseTarget, SchemaModel};
use flowsweep_janitor::Monitor;

/// Execute the status command.
pub fn execute_status(config: &Config, target: &DatabaseTarget, formatter: &Formatter) -> Result<()> {
    let store = open_read_only(target, config, "status")?;
    let monitor = Monitor::new(config.monitor, SchemaModel::prefect());

    let snapshot = monitor.snapshot(&store);
    let health = monitor.health(&snapshot);
    let recommendation = Monitor::recommendation(snapshot.total_rows());

    println!("{}", formatter.snapshot(&snapshot, health, recommendation)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::fixture;
    use crate::config::OutputFormat;
    use crate::error::CliError;

    #[test]
    fn test_status_reads_without_writing() {
        let fx = fixture(3, 2);
        let formatter = Formatter::new(OutputFormat::Json, false);
        execute_status(&fx.config, &fx.target, &formatter).unwrap();
        assert_eq!(fx.log_rows(), 5);
    }

    #[test]
    fn test_status_missing_database() {
        let fx = fixture(0, 0);
        let target = DatabaseTarget::parse(fx.dir.path().join("nope.db").to_str().unwrap()).unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let result = execute_status(&fx.config, &target, &formatter);
        assert!(matches!(result, Err(CliError::Store(_))));
    }
}

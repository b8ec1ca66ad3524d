//! Order command implementation.

use crate::error::Result;
use crate::output::Formatter;
use flowsweep_domain::SchemaModel;

/// Execute the order command.
pub fn execute_order(formatter: &Formatter) -> Result<()> {
    let schema = SchemaModel::prefect();
    let order = schema.deletion_order()?;
    println!("{}", formatter.deletion_order(&order)?);
    Ok(())
}

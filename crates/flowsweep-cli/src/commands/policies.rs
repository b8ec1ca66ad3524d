//! Policies command implementation.

use crate::error::Result;
use crate::output::Formatter;

/// Execute the policies command.
pub fn execute_policies(formatter: &Formatter) -> Result<()> {
    println!("{}", formatter.policies()?);
    Ok(())
}

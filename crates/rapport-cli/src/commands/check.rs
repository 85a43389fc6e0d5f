//! Check command implementation.

use crate::cli::CheckArgs;
use crate::error::Result;
use crate::output::Formatter;
use crate::script::Script;

/// Execute the check command.
pub fn execute_check(args: CheckArgs, formatter: &Formatter) -> Result<()> {
    let scenario = Script::load(&args.script)?.plan()?;
    println!("{}", formatter.format_check(&scenario)?);
    Ok(())
}

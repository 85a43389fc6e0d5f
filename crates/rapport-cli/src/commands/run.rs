//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::runner::run_scenario;
use crate::script::Script;
use rapport_store::StoreError;
use tracing::info;

/// Execute the run command.
///
/// Fails after printing the report if any expectation was not met or the
/// service ended in an inconsistent state.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let scenario = Script::load(&args.script)?.plan()?;
    info!(
        "Running {} step(s) over {} account(s)",
        scenario.steps.len(),
        scenario.accounts.len()
    );

    let report = run_scenario(scenario, config.store.clone()).await?;
    println!("{}", formatter.format_report(&report)?);

    if args.metrics {
        println!();
        println!("{}", report.metrics.summary);
    }

    if let Some(violation) = report.invariant_violation {
        return Err(CliError::Store(StoreError::InvariantViolation(violation)));
    }

    match report.failed_expectations() {
        0 => Ok(()),
        failed => Err(CliError::ExpectationFailed(failed)),
    }
}

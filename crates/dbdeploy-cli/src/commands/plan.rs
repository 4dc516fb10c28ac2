//! `dbdeploy plan` — Display the resolved deployment plan before applying.

use clap::Args;

use super::{GlobalArgs, TargetArgs};
use crate::output;

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Release and port to plan for.
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Executes the `plan` command.
///
/// Resolves the release exactly as `deploy` would, without querying or
/// mutating the container runtime.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the release is unknown.
pub fn execute(args: &PlanArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let (config, catalog) = global.load()?;
    let plan = args.target.resolve(&config, &catalog)?;
    output::emit(&output::format_plan(&plan));
    Ok(())
}

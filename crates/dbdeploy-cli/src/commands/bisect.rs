//! `dbdeploy bisect` — Print the release midway between two releases.

use clap::Args;

use super::GlobalArgs;
use crate::output;

/// Arguments for the `bisect` command.
#[derive(Args, Debug)]
pub struct BisectArgs {
    /// DBMS name.
    pub dbms: String,
    /// Last known good (older) release.
    pub old: String,
    /// First known bad (newer) release.
    pub new: String,
}

/// Executes the `bisect` command.
///
/// # Errors
///
/// Returns an error if either release is unknown or `new` precedes `old`.
pub fn execute(args: &BisectArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let (_, catalog) = global.load()?;
    let mid = catalog.bisect(&args.dbms, &args.old, &args.new)?;
    tracing::debug!(dbms = %args.dbms, old = %args.old, new = %args.new, mid = %mid.id, "bisected");
    output::emit(&mid.id);
    Ok(())
}

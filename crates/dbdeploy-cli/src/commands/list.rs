//! `dbdeploy list` — List DBMS names or the releases of one DBMS.

use clap::Args;

use super::GlobalArgs;
use crate::output;

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// DBMS whose releases to list; lists DBMS names when omitted.
    pub dbms: Option<String>,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or the DBMS is unknown.
pub fn execute(args: &ListArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let (_, catalog) = global.load()?;
    let text = match &args.dbms {
        Some(name) => output::format_releases(catalog.find_dbms(name)?),
        None => output::format_dbms_names(&catalog),
    };
    output::emit(&text);
    Ok(())
}

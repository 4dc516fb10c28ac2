//! `dbdeploy deploy` — Build, start and initialize a release.

use anyhow::Context;
use clap::Args;
use dbdeploy_image::fetch::HttpFetcher;
use dbdeploy_runtime::backend::docker::DockerCli;
use dbdeploy_runtime::engine::Deployer;

use super::{GlobalArgs, TargetArgs};
use crate::output;

/// Arguments for the `deploy` command.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Release and port to deploy.
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Executes the `deploy` command.
///
/// Realizes the image chain, reconciles the container bound to the port,
/// waits for the DBMS to accept connections and runs init commands on a
/// freshly created container.
///
/// # Errors
///
/// Returns an error on any lookup, build, runtime or readiness failure.
pub fn execute(args: &DeployArgs, global: &GlobalArgs) -> anyhow::Result<()> {
    let (config, catalog) = global.load()?;
    let plan = args.target.resolve(&config, &catalog)?;

    let docker = DockerCli::from_config(&config.runtime)?;
    let fetcher = HttpFetcher::new()?;
    let deployer = Deployer::new(&docker, &fetcher, &docker, config.readiness.clone());

    let report = deployer.deploy(&plan).with_context(|| {
        format!(
            "deploying {} {} on port {}",
            plan.dbms, plan.release, plan.host_port
        )
    })?;
    output::emit(&output::format_summary(&plan, &report));
    Ok(())
}

//! CLI command definitions and dispatch.

pub mod bisect;
pub mod deploy;
pub mod list;
pub mod plan;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dbdeploy_catalog::catalog::Catalog;
use dbdeploy_catalog::resolver::{Layout, Plan, Resolver};
use dbdeploy_common::config::DeployerConfig;
use dbdeploy_common::constants::BIN_NAME;

/// dbdeploy: DBMS release deployment and bisection on Docker.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// JSON configuration file.
    #[arg(long, global = true, env = "DBDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Release catalog (overrides the configuration).
    #[arg(long, global = true, env = "DBDEPLOY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory holding env/meta Dockerfile trees.
    #[arg(long, global = true, env = "DBDEPLOY_DOCKERDB_DIR")]
    pub dockerdb_dir: Option<PathBuf>,

    /// Directory receiving per-release build contexts.
    #[arg(long, global = true, env = "DBDEPLOY_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl GlobalArgs {
    /// Loads the configuration file, if any, and applies flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is unreadable or invalid.
    pub fn config(&self) -> anyhow::Result<DeployerConfig> {
        let mut config = match &self.config {
            Some(path) => DeployerConfig::load(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => DeployerConfig::default(),
        };
        if let Some(path) = &self.catalog {
            config.catalog_path.clone_from(path);
        }
        if let Some(dir) = &self.dockerdb_dir {
            config.dockerdb_dir.clone_from(dir);
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir.clone_from(dir);
        }
        Ok(config)
    }

    /// Loads the configuration and the catalog it points to.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is unreadable or invalid.
    pub fn load(&self) -> anyhow::Result<(DeployerConfig, Catalog)> {
        let config = self.config()?;
        let catalog = Catalog::load(&config.catalog_path)
            .with_context(|| format!("loading catalog {}", config.catalog_path.display()))?;
        Ok((config, catalog))
    }
}

/// A release bound to a host port.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// DBMS name, e.g. `mysql`.
    pub dbms: String,
    /// Version name or image tag.
    pub release: String,
    /// Host port to publish the DBMS on.
    pub port: u16,
}

impl TargetArgs {
    /// Resolves this target into a deployment plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the DBMS or release is unknown.
    pub fn resolve(&self, config: &DeployerConfig, catalog: &Catalog) -> anyhow::Result<Plan> {
        let plan = Resolver::new(catalog, Layout::from_config(config))
            .resolve(&self.dbms, &self.release, self.port)?;
        Ok(plan)
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List DBMS names, or the releases of one DBMS from oldest to newest.
    #[command(visible_alias = "ls")]
    List(list::ListArgs),
    /// Show the resolved deployment plan without touching the runtime.
    Plan(plan::PlanArgs),
    /// Build, start and initialize a release on a host port.
    #[command(visible_alias = "run")]
    Deploy(deploy::DeployArgs),
    /// Print the release midway between two releases.
    Bisect(bisect::BisectArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::List(args) => list::execute(&args, &cli.global),
        Command::Plan(args) => plan::execute(&args, &cli.global),
        Command::Deploy(args) => deploy::execute(&args, &cli.global),
        Command::Bisect(args) => bisect::execute(&args, &cli.global),
    }
}

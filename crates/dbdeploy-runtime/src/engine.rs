//! Deployment orchestrator.
//!
//! Runs one plan to completion: image chain, container transition,
//! readiness poll, then one-shot init on freshly created containers only.
//! Every failure aborts the remaining steps and leaves runtime state as is.

use std::time::Duration;

use dbdeploy_catalog::model::ProbeSpec;
use dbdeploy_catalog::resolver::Plan;
use dbdeploy_common::config::ReadinessConfig;
use dbdeploy_common::constants::LOCAL_HOST;
use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::{ContainerName, ImageRef};
use dbdeploy_image::builder::{BuildDriver, LayerOutcome};
use dbdeploy_image::fetch::ArtifactFetcher;
use dbdeploy_image::store::ImageStore;

use crate::backend::ContainerRuntime;
use crate::lifecycle::{self, Transition};
use crate::readiness::{ConnectProbe, ExecProbe, Poller, Probe};

/// Summary of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    /// Target container.
    pub container: ContainerName,
    /// Image the container runs.
    pub image: ImageRef,
    /// Realized images, oldest dependency first.
    pub layers: Vec<LayerOutcome>,
    /// Conflicting container stopped to free the port.
    pub evicted: Option<ContainerName>,
    /// Transition applied to the target.
    pub transition: Transition,
    /// Probe attempts until ready.
    pub ready_after: u32,
    /// Number of init commands executed.
    pub init_commands: usize,
}

/// Drives plans against an image store and a container runtime.
pub struct Deployer<'a> {
    store: &'a dyn ImageStore,
    fetcher: &'a dyn ArtifactFetcher,
    runtime: &'a dyn ContainerRuntime,
    readiness: ReadinessConfig,
}

impl std::fmt::Debug for Deployer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployer")
            .field("readiness", &self.readiness)
            .finish_non_exhaustive()
    }
}

impl<'a> Deployer<'a> {
    /// Creates a deployer.
    #[must_use]
    pub fn new(
        store: &'a dyn ImageStore,
        fetcher: &'a dyn ArtifactFetcher,
        runtime: &'a dyn ContainerRuntime,
        readiness: ReadinessConfig,
    ) -> Self {
        Self {
            store,
            fetcher,
            runtime,
            readiness,
        }
    }

    /// Realizes `plan` as a running, ready container.
    ///
    /// # Errors
    ///
    /// Returns the first build, runtime, readiness or init failure.
    pub fn deploy(&self, plan: &Plan) -> Result<DeployReport> {
        tracing::info!(dbms = %plan.dbms, release = %plan.release, port = plan.host_port, "deploying");

        let layers = BuildDriver::new(self.store, self.fetcher).realize(&plan.chain)?;

        let observation = lifecycle::observe(self.runtime, plan)?;
        let actions = lifecycle::plan_transition(&observation);
        let transition = lifecycle::apply(self.runtime, plan, &actions)?;
        let evicted = if transition == Transition::NoOp {
            None
        } else {
            observation.conflict
        };

        let probe = self.probe(plan);
        let ready_after =
            Poller::from_config(&self.readiness).wait_ready(plan.container.as_str(), &*probe)?;

        let init_commands = if transition == Transition::Created {
            self.initialize(plan)?
        } else {
            0
        };

        Ok(DeployReport {
            container: plan.container.clone(),
            image: plan.image.clone(),
            layers,
            evicted,
            transition,
            ready_after,
            init_commands,
        })
    }

    fn probe(&self, plan: &Plan) -> Box<dyn Probe + 'a> {
        match &plan.probe {
            ProbeSpec::Connect => Box::new(ConnectProbe::new(
                LOCAL_HOST,
                plan.host_port,
                plan.credentials.clone(),
                Duration::from_secs(self.readiness.connect_timeout_secs),
            )),
            ProbeSpec::Exec { command } => Box::new(ExecProbe::new(
                self.runtime,
                plan.container.clone(),
                command.clone(),
            )),
        }
    }

    fn initialize(&self, plan: &Plan) -> Result<usize> {
        for (i, command) in plan.init.iter().enumerate() {
            tracing::info!(container = %plan.container, step = i + 1, command = ?command, "running init command");
            let output = self.runtime.exec(&plan.container, command)?;
            if !output.success() {
                return Err(DeployError::Runtime {
                    operation: "init",
                    target: plan.container.to_string(),
                    message: format!("`{}` {}", command.join(" "), output.failure_message()),
                });
            }
        }
        Ok(plan.init.len())
    }
}

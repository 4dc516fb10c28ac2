//! Container runtime abstraction.

pub mod docker;

use std::path::PathBuf;

use dbdeploy_catalog::resolver::Plan;
use dbdeploy_common::command::CommandOutput;
use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::{ContainerName, ImageRef};

/// Parameters for creating a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Container name.
    pub name: ContainerName,
    /// Image to run.
    pub image: ImageRef,
    /// Port published on the host.
    pub host_port: u16,
    /// Port the service listens on inside the container.
    pub container_port: u16,
    /// Extra runtime flags, placed before the image.
    pub flags: Vec<String>,
}

impl RunSpec {
    /// Builds the run parameters of a plan's target container.
    #[must_use]
    pub fn from_plan(plan: &Plan) -> Self {
        Self {
            name: plan.container.clone(),
            image: plan.image.clone(),
            host_port: plan.host_port,
            container_port: plan.container_port,
            flags: plan.run_flags.clone(),
        }
    }
}

/// Container operations needed by the lifecycle state machine.
///
/// Implementors only report names and exit statuses; nothing above this
/// trait parses runtime output beyond line membership.
pub trait ContainerRuntime {
    /// Lists container names matching `filter`.
    ///
    /// Only running containers are listed unless `include_stopped` is set.
    /// The filter is a substring match; callers check exact names.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` if the runtime cannot be queried.
    fn list_names(&self, filter: &str, include_stopped: bool) -> Result<Vec<String>>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` if the stop fails.
    fn stop(&self, name: &ContainerName) -> Result<()>;

    /// Restarts an existing container.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` if the restart fails.
    fn restart(&self, name: &ContainerName) -> Result<()>;

    /// Creates and starts a detached container.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` if the container cannot be created.
    fn run(&self, spec: &RunSpec) -> Result<()>;

    /// Executes a command inside a running container.
    ///
    /// A non-zero exit is reported through the output, not as an error.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Runtime` if the command cannot be started.
    fn exec(&self, name: &ContainerName, command: &[String]) -> Result<CommandOutput>;
}

/// Locates the runtime program on `PATH`.
///
/// # Errors
///
/// Returns `DeployError::NotFound` if the program is not installed.
pub fn locate_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| DeployError::NotFound {
        kind: "container runtime",
        id: format!("{program} (install it or set runtime.program)"),
    })
}

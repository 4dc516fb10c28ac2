//! Docker CLI backend.
//!
//! Drives the `docker` program through a [`CommandRunner`]. Every
//! invocation is a structured [`CommandSpec`], optionally wrapped in the
//! configured command prefix (e.g. `sudo -n`).

use std::path::Path;

use dbdeploy_common::command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
use dbdeploy_common::config::RuntimeConfig;
use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::{ContainerName, ImageRef};
use dbdeploy_image::store::ImageStore;

use super::{ContainerRuntime, RunSpec, locate_program};

/// Container runtime driven through the Docker command line.
#[derive(Debug, Clone)]
pub struct DockerCli<R = SystemRunner> {
    program: String,
    prefix: Vec<String>,
    runner: R,
}

impl DockerCli<SystemRunner> {
    /// Creates a backend from configuration, locating the program on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the runtime program is missing.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let path = locate_program(&config.program)?;
        tracing::debug!(program = %path.display(), "container runtime located");
        Ok(Self::with_runner(
            path.to_string_lossy(),
            config.command_prefix.clone(),
            SystemRunner,
        ))
    }
}

impl<R: CommandRunner> DockerCli<R> {
    /// Creates a backend over an arbitrary command runner.
    #[must_use]
    pub fn with_runner(program: impl Into<String>, prefix: Vec<String>, runner: R) -> Self {
        Self {
            program: program.into(),
            prefix,
            runner,
        }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.program.clone()).args(args)
    }

    fn invoke(&self, spec: CommandSpec) -> std::io::Result<CommandOutput> {
        self.runner.run(&spec.with_prefix(&self.prefix))
    }

    /// Runs a container mutation, turning spawn failures and non-zero exits
    /// into runtime errors.
    fn mutate(&self, operation: &'static str, target: &str, spec: CommandSpec) -> Result<()> {
        let fail = |message: String| DeployError::Runtime {
            operation,
            target: target.to_string(),
            message,
        };
        let output = self.invoke(spec).map_err(|e| fail(e.to_string()))?;
        if !output.success() {
            return Err(fail(output.failure_message()));
        }
        Ok(())
    }

    fn realize(&self, stage: &'static str, image: &ImageRef, spec: CommandSpec) -> Result<()> {
        let fail = |message: String| DeployError::Build {
            image: image.to_string(),
            stage,
            message,
        };
        let output = self.invoke(spec).map_err(|e| fail(e.to_string()))?;
        if !output.success() {
            return Err(fail(output.failure_message()));
        }
        tracing::debug!(image = %image, stage, output = %output.stdout.trim_end(), "runtime output");
        Ok(())
    }
}

impl<R: CommandRunner> ImageStore for DockerCli<R> {
    fn image_exists(&self, image: &ImageRef) -> Result<bool> {
        let spec = self.command(["image", "inspect", "--format", "{{.Id}}"]).arg(image.to_string());
        let output = self.invoke(spec).map_err(|e| DeployError::Runtime {
            operation: "inspect",
            target: image.to_string(),
            message: e.to_string(),
        })?;
        Ok(output.success())
    }

    fn build_image(&self, image: &ImageRef, context: &Path) -> Result<()> {
        let spec = self
            .command(["build", "-t"])
            .args([image.to_string(), ".".to_string()])
            .current_dir(context);
        self.realize("build", image, spec)
    }

    fn pull_image(&self, image: &ImageRef) -> Result<()> {
        let spec = self.command(["pull"]).arg(image.to_string());
        self.realize("pull", image, spec)
    }
}

impl<R: CommandRunner> ContainerRuntime for DockerCli<R> {
    fn list_names(&self, filter: &str, include_stopped: bool) -> Result<Vec<String>> {
        let mut spec = self.command(["ps"]);
        if include_stopped {
            spec = spec.arg("-a");
        }
        let spec = spec.args([
            "--filter".to_string(),
            format!("name={filter}"),
            "--format".to_string(),
            "{{.Names}}".to_string(),
        ]);
        let fail = |message: String| DeployError::Runtime {
            operation: "ps",
            target: filter.to_string(),
            message,
        };
        let output = self.invoke(spec).map_err(|e| fail(e.to_string()))?;
        if !output.success() {
            return Err(fail(output.failure_message()));
        }
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    fn stop(&self, name: &ContainerName) -> Result<()> {
        self.mutate("stop", name.as_str(), self.command(["stop", name.as_str()]))
    }

    fn restart(&self, name: &ContainerName) -> Result<()> {
        self.mutate("restart", name.as_str(), self.command(["restart", name.as_str()]))
    }

    fn run(&self, spec: &RunSpec) -> Result<()> {
        let command = self
            .command(["run", "-itd", "--name", spec.name.as_str(), "-p"])
            .arg(format!("{}:{}", spec.host_port, spec.container_port))
            .args(spec.flags.iter().cloned())
            .arg(spec.image.to_string());
        self.mutate("run", spec.name.as_str(), command)
    }

    fn exec(&self, name: &ContainerName, command: &[String]) -> Result<CommandOutput> {
        let spec = self
            .command(["exec", name.as_str()])
            .args(command.iter().cloned());
        self.invoke(spec).map_err(|e| DeployError::Runtime {
            operation: "exec",
            target: name.to_string(),
            message: e.to_string(),
        })
    }
}

//! Synchronous process execution facility.
//!
//! Every container runtime invocation goes through a [`CommandRunner`] as a
//! structured [`CommandSpec`] (program plus ordered arguments). Nothing is
//! ever concatenated into a shell string, so arguments need no quoting.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

/// A command to execute: program, ordered arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,
    /// Ordered argument list.
    pub args: Vec<String>,
    /// Working directory, if different from the current one.
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments in order.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Wraps this command behind a prefix such as `["sudo", "-n"]`.
    ///
    /// The first prefix word becomes the program; the rest, followed by the
    /// original program and arguments, become the argument list.
    #[must_use]
    pub fn with_prefix(self, prefix: &[String]) -> Self {
        let Some((program, rest)) = prefix.split_first() else {
            return self;
        };
        let mut args = rest.to_vec();
        args.push(self.program);
        args.extend(self.args);
        Self {
            program: program.clone(),
            args,
            cwd: self.cwd,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the trimmed stderr, or the exit code when stderr is empty.
    #[must_use]
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            format!("exit code {}: {stderr}", self.exit_code)
        }
    }
}

/// Runs commands to completion, capturing their output.
pub trait CommandRunner {
    /// Runs the command and blocks until it exits.
    ///
    /// A non-zero exit is reported through [`CommandOutput::exit_code`],
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> std::io::Result<CommandOutput> {
        tracing::debug!(command = %spec, "exec");
        let mut command = Command::new(&spec.program);
        let _ = command.args(&spec.args);
        if let Some(dir) = &spec.cwd {
            let _ = command.current_dir(dir);
        }
        let output = command.output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_display_joins_arguments() {
        let spec = CommandSpec::new("docker").args(["ps", "-a"]);
        assert_eq!(spec.to_string(), "docker ps -a");
    }

    #[test]
    fn with_prefix_moves_program_into_arguments() {
        let prefix = vec!["sudo".to_string(), "-n".to_string()];
        let spec = CommandSpec::new("docker")
            .args(["stop", "c1"])
            .with_prefix(&prefix);
        assert_eq!(spec.program, "sudo");
        assert_eq!(spec.args, vec!["-n", "docker", "stop", "c1"]);
    }

    #[test]
    fn with_empty_prefix_is_identity() {
        let spec = CommandSpec::new("docker").arg("ps");
        assert_eq!(spec.clone().with_prefix(&[]), spec);
    }

    #[test]
    fn failure_message_falls_back_to_exit_code() {
        let output = CommandOutput {
            exit_code: 125,
            ..CommandOutput::default()
        };
        assert_eq!(output.failure_message(), "exit code 125");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_stdout_and_status() {
        let out = SystemRunner
            .run(&CommandSpec::new("sh").args(["-c", "echo hello; exit 3"]))
            .expect("run sh");
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_honours_working_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = SystemRunner
            .run(&CommandSpec::new("pwd").current_dir(dir.path()))
            .expect("run pwd");
        let reported = std::fs::canonicalize(out.stdout.trim()).expect("canonicalize");
        let expected = std::fs::canonicalize(dir.path()).expect("canonicalize");
        assert_eq!(reported, expected);
    }

    #[test]
    fn system_runner_missing_program_is_error() {
        assert!(SystemRunner
            .run(&CommandSpec::new("definitely-not-a-real-program-xyz"))
            .is_err());
    }
}

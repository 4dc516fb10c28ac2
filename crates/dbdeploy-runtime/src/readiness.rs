//! Readiness polling.
//!
//! A fixed-interval, fixed-budget loop: sleep, probe, count. No backoff.
//! Probes are read-only, so retrying them is always safe.

use std::time::Duration;

use dbdeploy_common::config::ReadinessConfig;
use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::{ContainerName, Credentials};
use mysql::prelude::Queryable;
use mysql::{Conn, OptsBuilder};
use thiserror::Error;

use crate::backend::ContainerRuntime;

/// Why a single probe attempt failed.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Connecting, logging in or running the statement failed.
    #[error("connection failed: {0}")]
    Connection(#[from] mysql::Error),

    /// The in-container probe command failed.
    #[error("probe command failed: {0}")]
    Command(String),
}

/// A single read-only readiness check.
pub trait Probe {
    /// Runs the check once.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if the service is not ready yet.
    fn check(&self) -> std::result::Result<(), ProbeError>;
}

/// Logs in over TCP, selects the default database and runs `SELECT 1`.
#[derive(Clone)]
pub struct ConnectProbe {
    host: String,
    port: u16,
    credentials: Credentials,
    timeout: Duration,
}

impl std::fmt::Debug for ConnectProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectProbe")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.credentials.user)
            .field("default_db", &self.credentials.default_db)
            .finish_non_exhaustive()
    }
}

impl ConnectProbe {
    /// Creates a probe logging in to `host:port` as `credentials.user`.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            timeout,
        }
    }

    fn opts(&self) -> OptsBuilder {
        OptsBuilder::new()
            .ip_or_hostname(Some(self.host.clone()))
            .tcp_port(self.port)
            .prefer_socket(false)
            .user(Some(self.credentials.user.clone()))
            .pass(Some(self.credentials.password.clone()))
            .tcp_connect_timeout(Some(self.timeout))
            .read_timeout(Some(self.timeout))
            .write_timeout(Some(self.timeout))
    }
}

impl Probe for ConnectProbe {
    fn check(&self) -> std::result::Result<(), ProbeError> {
        let mut conn = Conn::new(self.opts())?;
        let db = &self.credentials.default_db;
        if !db.is_empty() {
            conn.query_drop(format!("USE `{}`", db.replace('`', "``")))?;
        }
        conn.query_drop("SELECT 1")?;
        Ok(())
    }
}

/// Runs a command inside the container; exit status zero means ready.
pub struct ExecProbe<'a> {
    runtime: &'a dyn ContainerRuntime,
    container: ContainerName,
    command: Vec<String>,
}

impl std::fmt::Debug for ExecProbe<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecProbe")
            .field("container", &self.container)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<'a> ExecProbe<'a> {
    /// Creates a probe running `command` in `container`.
    #[must_use]
    pub fn new(
        runtime: &'a dyn ContainerRuntime,
        container: ContainerName,
        command: Vec<String>,
    ) -> Self {
        Self {
            runtime,
            container,
            command,
        }
    }
}

impl Probe for ExecProbe<'_> {
    fn check(&self) -> std::result::Result<(), ProbeError> {
        let output = self
            .runtime
            .exec(&self.container, &self.command)
            .map_err(|e| ProbeError::Command(e.to_string()))?;
        if output.success() {
            Ok(())
        } else {
            Err(ProbeError::Command(output.failure_message()))
        }
    }
}

/// Bounded readiness poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    /// Maximum number of probe attempts.
    pub max_attempts: u32,
    /// Sleep before every attempt.
    pub interval: Duration,
}

impl Poller {
    /// Creates a poller from configuration.
    #[must_use]
    pub const fn from_config(config: &ReadinessConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            interval: Duration::from_secs(config.interval_secs),
        }
    }

    /// Polls `probe` until it succeeds, returning the number of attempts.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Timeout` after `max_attempts` failed probes.
    pub fn wait_ready(&self, target: &str, probe: &dyn Probe) -> Result<u32> {
        tracing::info!(container = target, "waiting for ready");
        for attempt in 1..=self.max_attempts {
            std::thread::sleep(self.interval);
            match probe.check() {
                Ok(()) => {
                    tracing::info!(container = target, attempt, "ready");
                    return Ok(attempt);
                }
                Err(e) => {
                    tracing::info!(container = target, attempt, error = %e, "not ready");
                }
            }
        }
        Err(DeployError::Timeout {
            target: target.to_string(),
            attempts: self.max_attempts,
        })
    }
}

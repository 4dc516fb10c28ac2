//! Global configuration model for dbdeploy.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DeployError, Result};

/// Root configuration for a dbdeploy invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    /// Path to the JSON catalog.
    pub catalog_path: PathBuf,
    /// Directory holding `<dbms>/<env|meta>/` Dockerfile trees.
    pub dockerdb_dir: PathBuf,
    /// Directory holding `<dbms>/<release>/` build contexts.
    pub download_dir: PathBuf,
    /// Prefix for built image repositories.
    pub image_prefix: String,
    /// Prefix for container names.
    pub container_prefix: String,
    /// Readiness poll settings.
    pub readiness: ReadinessConfig,
    /// Container runtime invocation settings.
    pub runtime: RuntimeConfig,
}

impl Default for DeployerConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(constants::DEFAULT_CATALOG_PATH),
            dockerdb_dir: PathBuf::from(constants::DEFAULT_DOCKERDB_DIR),
            download_dir: PathBuf::from(constants::DEFAULT_DOWNLOAD_DIR),
            image_prefix: constants::DEFAULT_IMAGE_PREFIX.to_string(),
            container_prefix: constants::DEFAULT_CONTAINER_PREFIX.to_string(),
            readiness: ReadinessConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl DeployerConfig {
    /// Loads a configuration file, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| DeployError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| DeployError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}

/// Bounded readiness poll settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum number of probe attempts.
    pub max_attempts: u32,
    /// Seconds slept before every attempt.
    pub interval_secs: u64,
    /// Connect/read timeout of the protocol probe.
    pub connect_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_READY_ATTEMPTS,
            interval_secs: constants::DEFAULT_READY_INTERVAL_SECS,
            connect_timeout_secs: constants::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// How the container runtime program is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Runtime program name or path.
    pub program: String,
    /// Words placed before the program, e.g. `["sudo", "-n"]`.
    pub command_prefix: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: constants::DEFAULT_RUNTIME_PROGRAM.to_string(),
            command_prefix: Vec::new(),
        }
    }
}

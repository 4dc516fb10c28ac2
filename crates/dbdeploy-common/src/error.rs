//! Unified error types for the dbdeploy workspace.
//!
//! Every failure surfaces as a [`DeployError`] and travels up to the CLI,
//! which reports it and exits non-zero. Nothing below the CLI retries except
//! the bounded readiness poll.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The catalog or configuration is unreadable or malformed.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A DBMS, release, bisect endpoint or program is unknown.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An artifact fetch, template preparation or image build failed.
    #[error("build of {image} failed during {stage}: {message}")]
    Build {
        /// Image (or artifact) being realized.
        image: String,
        /// Build stage that failed.
        stage: &'static str,
        /// Underlying failure.
        message: String,
    },

    /// A container runtime mutation or exec failed.
    #[error("{operation} {target} failed: {message}")]
    Runtime {
        /// Runtime operation (stop, restart, run, exec, ...).
        operation: &'static str,
        /// Container or image the operation targeted.
        target: String,
        /// Underlying failure.
        message: String,
    },

    /// The readiness poll exhausted its attempt budget.
    #[error("{target} not ready after {attempts} attempts")]
    Timeout {
        /// Container that never became ready.
        target: String,
        /// Number of probe attempts made.
        attempts: u32,
    },

    /// Reading the catalog or configuration failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Coarse failure category used when reporting an aborted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Catalog or configuration problem.
    Config,
    /// Unknown identifier.
    NotFound,
    /// Fetch or build failure.
    Build,
    /// Container runtime failure.
    Runtime,
    /// Readiness poll exhausted.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::NotFound => write!(f, "not-found"),
            Self::Build => write!(f, "build"),
            Self::Runtime => write!(f, "runtime"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

impl DeployError {
    /// Returns the reporting category of this error.
    ///
    /// `Io` and `Serialization` are raised while loading the catalog or
    /// configuration. Build-time file failures are reported as `Build`.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::Io { .. } | Self::Serialization { .. } => {
                ErrorKind::Config
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Build { .. } => ErrorKind::Build,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_identifier() {
        let err = DeployError::NotFound {
            kind: "release",
            id: "5.0.15".into(),
        };
        assert_eq!(err.to_string(), "release not found: 5.0.15");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn build_message_names_stage() {
        let err = DeployError::Build {
            image: "qaqcatz-mysql:5.0.15".into(),
            stage: "build",
            message: "exit status 1".into(),
        };
        assert!(err.to_string().contains("during build"));
        assert_eq!(err.kind(), ErrorKind::Build);
    }

    #[test]
    fn io_errors_report_as_config() {
        let err = DeployError::Io {
            path: PathBuf::from("db.json"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn serialization_errors_report_as_config() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err = DeployError::from(source);
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}

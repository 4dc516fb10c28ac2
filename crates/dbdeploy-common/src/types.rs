//! Domain primitive types used across the dbdeploy workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a managed container, e.g. `qaqcatz-3306-mysql-5.0.15`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerName(String);

impl ContainerName {
    /// Creates a container name from a string value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An image reference addressed by `repo:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Repository name.
    pub repo: String,
    /// Tag within the repository.
    pub tag: String,
}

impl ImageRef {
    /// Creates an image reference.
    #[must_use]
    pub fn new(repo: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repo, self.tag)
    }
}

/// SHA-256 digest used to verify downloaded artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Creates a hash from a hex-encoded string, normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a valid 64-character hex string.
    pub fn from_hex(hex: impl Into<String>) -> crate::error::Result<Self> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::error::DeployError::Config {
                message: format!("invalid SHA-256 hex string: {hex}"),
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Returns the hex-encoded hash string.
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}

/// Observed lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// No container with this name exists.
    Absent,
    /// The container exists but is not running.
    Stopped,
    /// The container is running.
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Connection details of a deployed instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: String,
    /// Database selected by default.
    pub default_db: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_ref_displays_repo_and_tag() {
        let image = ImageRef::new("qaqcatz-mysql", "5.0.15");
        assert_eq!(image.to_string(), "qaqcatz-mysql:5.0.15");
    }

    #[test]
    fn sha256_from_hex_normalizes_case() {
        let upper = "AB".repeat(32);
        let hash = Sha256Hash::from_hex(upper).expect("valid");
        assert_eq!(hash.as_hex(), "ab".repeat(32));
        assert!(hash.to_string().starts_with("sha256:"));
    }

    #[test]
    fn sha256_from_hex_rejects_bad_input() {
        assert!(Sha256Hash::from_hex("abc").is_err());
        assert!(Sha256Hash::from_hex("z".repeat(64)).is_err());
    }

    #[test]
    fn container_state_display_is_lowercase() {
        assert_eq!(ContainerState::Absent.to_string(), "absent");
        assert_eq!(ContainerState::Stopped.to_string(), "stopped");
        assert_eq!(ContainerState::Running.to_string(), "running");
    }
}

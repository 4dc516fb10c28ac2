//! Catalog data model.
//!
//! The on-disk JSON keeps the historical shape (`versions` built from
//! source, `images` pulled prebuilt). Both are converted into one
//! [`Release`] type whose [`ReleaseSource`] is decided by which fields an
//! entry populates.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use dbdeploy_common::error::{DeployError, Result};
use dbdeploy_common::types::{Credentials, ImageRef, Sha256Hash};
use serde::{Deserialize, Serialize};

/// How readiness of a deployed instance is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeSpec {
    /// Log in on the host port with the DBMS credentials and run `SELECT 1`.
    #[default]
    Connect,
    /// Run a command inside the container; exit status zero means ready.
    Exec {
        /// Command and arguments.
        command: Vec<String>,
    },
}

/// A file downloaded into a release's build context before building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    /// File name, appended to the release's URL prefix.
    pub file_name: String,
    /// Expected SHA-256 of the file.
    pub sha256: Option<Sha256Hash>,
}

/// A release built locally from the env/meta Dockerfile trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSource {
    /// URL prefix artifacts are fetched from.
    pub url_prefix: String,
    /// Artifacts required in the build context.
    pub artifacts: Vec<ArtifactSpec>,
    /// Meta template directory whose Dockerfile seeds the build context.
    pub meta: Option<String>,
    /// Environment layer directory built as the base image.
    pub env: Option<String>,
}

/// Where a release's image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    /// Built from source through the env → meta → release chain.
    BuildFromSource(BuildSource),
    /// Pulled as a prebuilt image.
    PullPrebuilt(ImageRef),
}

/// A single version or prebuilt image of a DBMS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Identifier, unique within its DBMS.
    pub id: String,
    /// Image origin.
    pub source: ReleaseSource,
    /// `docker run` flags overriding the DBMS default when non-empty.
    pub run_flags: Vec<String>,
    /// Readiness probe overriding the DBMS default when set.
    pub readiness: Option<ProbeSpec>,
    /// One-shot init commands overriding the DBMS default when non-empty.
    pub init: Vec<Vec<String>>,
}

/// A DBMS product and its releases, oldest first.
#[derive(Debug)]
pub struct DbmsEntry {
    /// Unique DBMS name.
    pub name: String,
    /// Port the DBMS listens on inside the container.
    pub port: u16,
    /// Default connection credentials.
    pub credentials: Credentials,
    /// Default `docker run` flags.
    pub run_flags: Vec<String>,
    /// Default readiness probe.
    pub readiness: Option<ProbeSpec>,
    /// Default one-shot init commands.
    pub init: Vec<Vec<String>>,
    releases: Vec<Release>,
    index: OnceLock<HashMap<String, usize>>,
}

impl DbmsEntry {
    /// Creates an entry from releases in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Config` if two releases share an identifier.
    pub fn new(
        name: impl Into<String>,
        port: u16,
        credentials: Credentials,
        releases: Vec<Release>,
    ) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::with_capacity(releases.len());
        if let Some(dup) = releases.iter().find(|r| !seen.insert(r.id.as_str())) {
            return Err(DeployError::Config {
                message: format!("dbms {name}: duplicate release {}", dup.id),
            });
        }
        Ok(Self {
            name,
            port,
            credentials,
            run_flags: Vec::new(),
            readiness: None,
            init: Vec::new(),
            releases,
            index: OnceLock::new(),
        })
    }

    /// Returns the releases in catalog order, oldest first.
    #[must_use]
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    /// Looks up a release by exact identifier.
    ///
    /// The identifier index is built on the first lookup and reused for
    /// the lifetime of the entry.
    #[must_use]
    pub fn release(&self, id: &str) -> Option<&Release> {
        let index = self.index.get_or_init(|| {
            tracing::debug!(dbms = %self.name, releases = self.releases.len(), "indexing releases");
            self.releases
                .iter()
                .enumerate()
                .map(|(i, r)| (r.id.clone(), i))
                .collect()
        });
        index.get(id).and_then(|&i| self.releases.get(i))
    }
}

// ---------------------------------------------------------------------------
// On-disk representation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawArtifact {
    Name(String),
    Detailed { name: String, sha256: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawDbms {
    name: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    password: String,
    port: PortValue,
    #[serde(default, rename = "defaultDB")]
    default_db: String,
    #[serde(default)]
    run_flags: Vec<String>,
    #[serde(default)]
    readiness: Option<ProbeSpec>,
    #[serde(default)]
    init: Vec<Vec<String>>,
    #[serde(default)]
    versions: Vec<RawRelease>,
    #[serde(default)]
    images: Vec<RawRelease>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRelease {
    name: Option<String>,
    url_prefix: Option<String>,
    #[serde(default)]
    file_names: Vec<RawArtifact>,
    meta: Option<String>,
    env: Option<String>,
    repo: Option<String>,
    tag: Option<String>,
    #[serde(default)]
    run_flags: Vec<String>,
    #[serde(default)]
    readiness: Option<ProbeSpec>,
    #[serde(default)]
    init: Vec<Vec<String>>,
}

impl TryFrom<RawDbms> for DbmsEntry {
    type Error = DeployError;

    fn try_from(raw: RawDbms) -> Result<Self> {
        let port = match raw.port {
            PortValue::Number(p) => p,
            PortValue::Text(s) => s.trim().parse().map_err(|_| DeployError::Config {
                message: format!("dbms {}: invalid port {s:?}", raw.name),
            })?,
        };

        check_commands(raw.readiness.as_ref(), &raw.init).map_err(|message| {
            DeployError::Config {
                message: format!("dbms {}: {message}", raw.name),
            }
        })?;

        let releases = raw
            .versions
            .into_iter()
            .chain(raw.images)
            .map(|r| convert_release(&raw.name, r))
            .collect::<Result<Vec<_>>>()?;

        let mut entry = Self::new(
            raw.name,
            port,
            Credentials {
                user: raw.user,
                password: raw.password,
                default_db: raw.default_db,
            },
            releases,
        )?;
        entry.run_flags = raw.run_flags;
        entry.readiness = raw.readiness;
        entry.init = raw.init;
        Ok(entry)
    }
}

fn convert_release(dbms: &str, raw: RawRelease) -> Result<Release> {
    let wants_pull = raw.repo.is_some() || raw.tag.is_some();
    let wants_build = raw.url_prefix.is_some()
        || !raw.file_names.is_empty()
        || raw.meta.is_some()
        || raw.env.is_some();
    let label = raw
        .name
        .clone()
        .or_else(|| raw.tag.clone())
        .unwrap_or_else(|| "<unnamed>".to_string());
    let invalid = |message: &str| DeployError::Config {
        message: format!("dbms {dbms}: release {label}: {message}"),
    };

    check_commands(raw.readiness.as_ref(), &raw.init).map_err(invalid)?;

    let source = match (wants_pull, wants_build) {
        (true, true) => return Err(invalid("declares both build and pull fields")),
        (true, false) => {
            let (Some(repo), Some(tag)) = (raw.repo, raw.tag.clone()) else {
                return Err(invalid("pull releases need both repo and tag"));
            };
            ReleaseSource::PullPrebuilt(ImageRef::new(repo, tag))
        }
        (false, _) => ReleaseSource::BuildFromSource(BuildSource {
            url_prefix: raw.url_prefix.unwrap_or_default(),
            artifacts: raw
                .file_names
                .into_iter()
                .map(|a| -> Result<ArtifactSpec> {
                    Ok(match a {
                        RawArtifact::Name(file_name) => ArtifactSpec {
                            file_name,
                            sha256: None,
                        },
                        RawArtifact::Detailed { name, sha256 } => ArtifactSpec {
                            file_name: name,
                            sha256: sha256.map(Sha256Hash::from_hex).transpose()?,
                        },
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            meta: raw.meta,
            env: raw.env,
        }),
    };

    let id = raw
        .name
        .or(raw.tag)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("missing name"))?;

    Ok(Release {
        id,
        source,
        run_flags: raw.run_flags,
        readiness: raw.readiness,
        init: raw.init,
    })
}

/// Rejects exec probes and init steps without a program to run.
fn check_commands(
    readiness: Option<&ProbeSpec>,
    init: &[Vec<String>],
) -> std::result::Result<(), &'static str> {
    if matches!(readiness, Some(ProbeSpec::Exec { command }) if command.is_empty()) {
        return Err("exec probe has an empty command");
    }
    if init.iter().any(Vec::is_empty) {
        return Err("init contains an empty command");
    }
    Ok(())
}

//! Deployment plan resolution.
//!
//! Turns a `(dbms, release, host port)` request into a fully materialized
//! [`Plan`]: container name, image reference, build chain, artifact set,
//! readiness probe and init commands. Resolution is pure; nothing here
//! touches the filesystem or the container runtime.

use std::path::PathBuf;

use dbdeploy_common::config::DeployerConfig;
use dbdeploy_common::constants::{DOCKERFILE_NAME, ENV_REPO_SUFFIX};
use dbdeploy_common::error::Result;
use dbdeploy_common::types::{ContainerName, Credentials, ImageRef, Sha256Hash};

use crate::catalog::Catalog;
use crate::model::{BuildSource, DbmsEntry, ProbeSpec, Release, ReleaseSource};

/// Directory and naming conventions used to materialize plans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Root of the `<dbms>/<env|meta>/` Dockerfile trees.
    pub dockerdb_dir: PathBuf,
    /// Root of the `<dbms>/<release>/` build contexts.
    pub download_dir: PathBuf,
    /// Prefix for built image repositories.
    pub image_prefix: String,
    /// Prefix for container names.
    pub container_prefix: String,
}

impl Layout {
    /// Extracts the layout from a configuration.
    #[must_use]
    pub fn from_config(config: &DeployerConfig) -> Self {
        Self {
            dockerdb_dir: config.dockerdb_dir.clone(),
            download_dir: config.download_dir.clone(),
            image_prefix: config.image_prefix.clone(),
            container_prefix: config.container_prefix.clone(),
        }
    }

    /// Returns the prefix shared by every container bound to `host_port`.
    ///
    /// Ends with the separator so port 3306 never matches port 33061.
    #[must_use]
    pub fn port_prefix(&self, host_port: u16) -> String {
        format!("{}-{host_port}-", self.container_prefix)
    }

    /// Returns the container name for a release bound to `host_port`.
    #[must_use]
    pub fn container_name(&self, host_port: u16, dbms: &str, release: &str) -> ContainerName {
        ContainerName::new(format!("{}{dbms}-{release}", self.port_prefix(host_port)))
    }
}

/// Role of an image built from a local context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    /// Shared environment base image.
    Env,
    /// The release image itself.
    Release,
}

/// A file to download into a build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name inside the target directory.
    pub file_name: String,
    /// Download URL.
    pub url: String,
    /// Expected SHA-256 of the file.
    pub sha256: Option<Sha256Hash>,
}

/// Artifacts and the directory they are fetched into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    /// Target directory.
    pub dir: PathBuf,
    /// Artifacts in catalog order.
    pub items: Vec<Artifact>,
}

/// One step of a build chain, ordered oldest dependency first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// Build `image` from `context` unless it already exists.
    Build {
        /// Role of the built image.
        role: LayerRole,
        /// Image to realize.
        image: ImageRef,
        /// Build context directory.
        context: PathBuf,
        /// Artifacts the context needs before building.
        artifacts: Option<ArtifactSet>,
    },
    /// Copy a shared Dockerfile template into a build context.
    Template {
        /// Template Dockerfile.
        source: PathBuf,
        /// Build context receiving the copy.
        context: PathBuf,
    },
    /// Pull a prebuilt image unless it already exists.
    Pull {
        /// Image to realize.
        image: ImageRef,
    },
}

/// Everything needed to realize one release as a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// DBMS name.
    pub dbms: String,
    /// Release identifier.
    pub release: String,
    /// Target container name.
    pub container: ContainerName,
    /// Name prefix shared by all containers on the same host port.
    pub port_prefix: String,
    /// Image the container runs.
    pub image: ImageRef,
    /// Port published on the host.
    pub host_port: u16,
    /// Port the DBMS listens on inside the container.
    pub container_port: u16,
    /// Connection credentials.
    pub credentials: Credentials,
    /// Effective `docker run` flags.
    pub run_flags: Vec<String>,
    /// Effective readiness probe.
    pub probe: ProbeSpec,
    /// Effective one-shot init commands.
    pub init: Vec<Vec<String>>,
    /// Image build chain.
    pub chain: Vec<BuildStep>,
}

/// Resolves deployment requests against a catalog.
#[derive(Debug)]
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    layout: Layout,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `catalog` using `layout`.
    #[must_use]
    pub const fn new(catalog: &'a Catalog, layout: Layout) -> Self {
        Self { catalog, layout }
    }

    /// Resolves a release into a deployment plan.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the DBMS or release is unknown.
    pub fn resolve(&self, dbms: &str, release_id: &str, host_port: u16) -> Result<Plan> {
        let entry = self.catalog.find_dbms(dbms)?;
        let release = self.catalog.find_release(dbms, release_id)?;

        let (image, chain) = match &release.source {
            ReleaseSource::BuildFromSource(build) => self.build_chain(entry, release, build),
            ReleaseSource::PullPrebuilt(image) => {
                (image.clone(), vec![BuildStep::Pull { image: image.clone() }])
            }
        };

        let plan = Plan {
            dbms: entry.name.clone(),
            release: release.id.clone(),
            container: self.layout.container_name(host_port, &entry.name, &release.id),
            port_prefix: self.layout.port_prefix(host_port),
            image,
            host_port,
            container_port: entry.port,
            credentials: entry.credentials.clone(),
            run_flags: pick(&release.run_flags, &entry.run_flags),
            probe: release
                .readiness
                .clone()
                .or_else(|| entry.readiness.clone())
                .unwrap_or_default(),
            init: pick(&release.init, &entry.init),
            chain,
        };
        tracing::debug!(container = %plan.container, image = %plan.image, steps = plan.chain.len(), "plan resolved");
        Ok(plan)
    }

    fn build_chain(
        &self,
        entry: &DbmsEntry,
        release: &Release,
        build: &BuildSource,
    ) -> (ImageRef, Vec<BuildStep>) {
        let dbms_dir = self.layout.dockerdb_dir.join(&entry.name);
        let context = self.layout.download_dir.join(&entry.name).join(&release.id);
        let image = ImageRef::new(
            format!("{}-{}", self.layout.image_prefix, entry.name),
            release.id.clone(),
        );

        let mut chain = Vec::with_capacity(3);
        if let Some(env) = &build.env {
            chain.push(BuildStep::Build {
                role: LayerRole::Env,
                image: ImageRef::new(
                    format!("{}-{}-{ENV_REPO_SUFFIX}", self.layout.image_prefix, entry.name),
                    env.clone(),
                ),
                context: dbms_dir.join(env),
                artifacts: None,
            });
        }
        if let Some(meta) = &build.meta {
            chain.push(BuildStep::Template {
                source: dbms_dir.join(meta).join(DOCKERFILE_NAME),
                context: context.clone(),
            });
        }
        let artifacts = ArtifactSet {
            dir: context.clone(),
            items: build
                .artifacts
                .iter()
                .map(|a| Artifact {
                    file_name: a.file_name.clone(),
                    url: format!("{}{}", build.url_prefix, a.file_name),
                    sha256: a.sha256.clone(),
                })
                .collect(),
        };
        chain.push(BuildStep::Build {
            role: LayerRole::Release,
            image: image.clone(),
            context,
            artifacts: Some(artifacts),
        });
        (image, chain)
    }
}

/// Release-level value when non-empty, DBMS default otherwise; never merged.
fn pick<T: Clone>(release: &[T], dbms: &[T]) -> Vec<T> {
    if release.is_empty() {
        dbms.to_vec()
    } else {
        release.to_vec()
    }
}

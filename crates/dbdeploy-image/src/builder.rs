//! Build dependency driver.
//!
//! Walks a plan's build chain oldest dependency first and makes sure every
//! image exists. Images are existence-idempotent: a present `repo:tag` is
//! never rebuilt. A failure aborts the chain and leaves already realized
//! lower layers cached for the next attempt.

use std::path::Path;

use dbdeploy_catalog::resolver::{ArtifactSet, BuildStep};
use dbdeploy_common::error::Result;
use dbdeploy_common::types::ImageRef;

use crate::fetch::{self, ArtifactFetcher};
use crate::store::ImageStore;
use crate::template;

/// How an image came to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// Already present, nothing done.
    Cached,
    /// Built from a local context.
    Built,
    /// Pulled from a registry.
    Pulled,
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::Built => write!(f, "built"),
            Self::Pulled => write!(f, "pulled"),
        }
    }
}

/// Result of realizing one image of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOutcome {
    /// The realized image.
    pub image: ImageRef,
    /// What was done to realize it.
    pub status: ImageStatus,
}

/// Realizes images through an [`ImageStore`], fetching artifacts on demand.
pub struct BuildDriver<'a> {
    store: &'a dyn ImageStore,
    fetcher: &'a dyn ArtifactFetcher,
}

impl std::fmt::Debug for BuildDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildDriver").finish_non_exhaustive()
    }
}

impl<'a> BuildDriver<'a> {
    /// Creates a driver over an image store and an artifact fetcher.
    #[must_use]
    pub fn new(store: &'a dyn ImageStore, fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self { store, fetcher }
    }

    /// Ensures `image` exists, building it from `context` if missing.
    ///
    /// Missing artifacts are fetched into the context before building.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried, a fetch fails or
    /// the build fails.
    pub fn ensure_image(
        &self,
        image: &ImageRef,
        context: &Path,
        artifacts: Option<&ArtifactSet>,
    ) -> Result<ImageStatus> {
        self.ensure_built(image, context, artifacts, None)
    }

    /// Ensures `image` exists, pulling it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried or the pull fails.
    pub fn ensure_pulled(&self, image: &ImageRef) -> Result<ImageStatus> {
        if self.store.image_exists(image)? {
            tracing::info!(image = %image, "image already exists");
            return Ok(ImageStatus::Cached);
        }
        tracing::info!(image = %image, "pulling image");
        self.store.pull_image(image)?;
        Ok(ImageStatus::Pulled)
    }

    /// Realizes every step of `chain` in order.
    ///
    /// A template step is applied only when the image built after it is
    /// missing, so a cached release never needs its template tree.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later steps are not attempted.
    pub fn realize(&self, chain: &[BuildStep]) -> Result<Vec<LayerOutcome>> {
        let mut outcomes = Vec::with_capacity(chain.len());
        let mut pending_template: Option<(&Path, &Path)> = None;

        for step in chain {
            match step {
                BuildStep::Template { source, context } => {
                    pending_template = Some((source.as_path(), context.as_path()));
                }
                BuildStep::Build {
                    image,
                    context,
                    artifacts,
                    ..
                } => {
                    let seed = pending_template.take();
                    let status = self.ensure_built(image, context, artifacts.as_ref(), seed)?;
                    outcomes.push(LayerOutcome {
                        image: image.clone(),
                        status,
                    });
                }
                BuildStep::Pull { image } => {
                    let status = self.ensure_pulled(image)?;
                    outcomes.push(LayerOutcome {
                        image: image.clone(),
                        status,
                    });
                }
            }
        }

        if let Some((source, context)) = pending_template {
            let _ = template::copy_template(source, context)?;
        }
        Ok(outcomes)
    }

    fn ensure_built(
        &self,
        image: &ImageRef,
        context: &Path,
        artifacts: Option<&ArtifactSet>,
        seed: Option<(&Path, &Path)>,
    ) -> Result<ImageStatus> {
        if self.store.image_exists(image)? {
            tracing::info!(image = %image, "image already exists");
            return Ok(ImageStatus::Cached);
        }
        if let Some(set) = artifacts {
            let report = fetch::fetch_missing(self.fetcher, set)?;
            tracing::debug!(
                fetched = report.fetched.len(),
                present = report.present.len(),
                "artifacts ready"
            );
        }
        if let Some((source, dest)) = seed {
            let _ = template::copy_template(source, dest)?;
        }
        tracing::info!(image = %image, context = %context.display(), "building image");
        self.store.build_image(image, context)?;
        Ok(ImageStatus::Built)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::PathBuf;

    use dbdeploy_catalog::resolver::{Artifact, LayerRole};
    use dbdeploy_common::error::DeployError;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        present: RefCell<HashSet<String>>,
        builds: RefCell<Vec<(String, PathBuf)>>,
        pulls: RefCell<Vec<String>>,
        fail_build: Option<String>,
    }

    impl FakeStore {
        fn with_present(images: &[&str]) -> Self {
            let store = Self::default();
            store
                .present
                .borrow_mut()
                .extend(images.iter().map(ToString::to_string));
            store
        }
    }

    impl ImageStore for FakeStore {
        fn image_exists(&self, image: &ImageRef) -> Result<bool> {
            Ok(self.present.borrow().contains(&image.to_string()))
        }

        fn build_image(&self, image: &ImageRef, context: &Path) -> Result<()> {
            if self.fail_build.as_deref() == Some(image.to_string().as_str()) {
                return Err(DeployError::Build {
                    image: image.to_string(),
                    stage: "build",
                    message: "exit code 1".into(),
                });
            }
            self.builds
                .borrow_mut()
                .push((image.to_string(), context.to_path_buf()));
            let _ = self.present.borrow_mut().insert(image.to_string());
            Ok(())
        }

        fn pull_image(&self, image: &ImageRef) -> Result<()> {
            self.pulls.borrow_mut().push(image.to_string());
            let _ = self.present.borrow_mut().insert(image.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingFetcher {
        calls: RefCell<usize>,
    }

    impl ArtifactFetcher for CountingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            *self.calls.borrow_mut() += 1;
            std::fs::write(dest, b"data").map_err(|e| DeployError::Build {
                image: url.to_string(),
                stage: "fetch",
                message: e.to_string(),
            })
        }
    }

    fn chain(root: &Path) -> Vec<BuildStep> {
        let template = root.join("dockerdb/mysql/meta1/Dockerfile");
        std::fs::create_dir_all(template.parent().expect("parent")).expect("mkdir");
        std::fs::write(&template, "FROM qaqcatz-mysql-env:env1\n").expect("write");
        let context = root.join("download/mysql/5.0.15");
        vec![
            BuildStep::Build {
                role: LayerRole::Env,
                image: ImageRef::new("qaqcatz-mysql-env", "env1"),
                context: root.join("dockerdb/mysql/env1"),
                artifacts: None,
            },
            BuildStep::Template {
                source: template,
                context: context.clone(),
            },
            BuildStep::Build {
                role: LayerRole::Release,
                image: ImageRef::new("qaqcatz-mysql", "5.0.15"),
                context: context.clone(),
                artifacts: Some(ArtifactSet {
                    dir: context,
                    items: vec![Artifact {
                        file_name: "mysql-5.0.15.tar.gz".into(),
                        url: "https://dl.example.com/mysql-5.0.15.tar.gz".into(),
                        sha256: None,
                    }],
                }),
            },
        ]
    }

    #[test]
    fn ensure_image_on_present_image_builds_nothing() {
        let store = FakeStore::with_present(&["qaqcatz-mysql:5.0.15"]);
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);
        let image = ImageRef::new("qaqcatz-mysql", "5.0.15");

        let first = driver
            .ensure_image(&image, Path::new("ctx"), None)
            .expect("first");
        let second = driver
            .ensure_image(&image, Path::new("ctx"), None)
            .expect("second");
        assert_eq!(first, ImageStatus::Cached);
        assert_eq!(second, ImageStatus::Cached);
        assert!(store.builds.borrow().is_empty());
    }

    #[test]
    fn ensure_image_twice_builds_once() {
        let store = FakeStore::default();
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);
        let image = ImageRef::new("qaqcatz-mysql", "5.0.15");

        assert_eq!(
            driver
                .ensure_image(&image, Path::new("ctx"), None)
                .expect("first"),
            ImageStatus::Built
        );
        assert_eq!(
            driver
                .ensure_image(&image, Path::new("ctx"), None)
                .expect("second"),
            ImageStatus::Cached
        );
        assert_eq!(store.builds.borrow().len(), 1);
    }

    #[test]
    fn realize_builds_chain_bottom_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore::default();
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);

        let outcomes = driver.realize(&chain(dir.path())).expect("realize");
        let built: Vec<String> = store.builds.borrow().iter().map(|b| b.0.clone()).collect();
        assert_eq!(built, vec!["qaqcatz-mysql-env:env1", "qaqcatz-mysql:5.0.15"]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == ImageStatus::Built));

        let context = dir.path().join("download/mysql/5.0.15");
        assert!(context.join("Dockerfile").exists());
        assert!(context.join("mysql-5.0.15.tar.gz").exists());
        assert_eq!(*fetcher.calls.borrow(), 1);
    }

    #[test]
    fn realize_skips_template_and_fetch_for_cached_release() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore::with_present(&["qaqcatz-mysql-env:env1", "qaqcatz-mysql:5.0.15"]);
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);

        let outcomes = driver.realize(&chain(dir.path())).expect("realize");
        assert!(outcomes.iter().all(|o| o.status == ImageStatus::Cached));
        assert!(store.builds.borrow().is_empty());
        assert_eq!(*fetcher.calls.borrow(), 0);
        assert!(!dir.path().join("download/mysql/5.0.15/Dockerfile").exists());
    }

    #[test]
    fn failed_release_build_keeps_lower_layers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FakeStore {
            fail_build: Some("qaqcatz-mysql:5.0.15".into()),
            ..FakeStore::default()
        };
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);

        let err = driver.realize(&chain(dir.path())).unwrap_err();
        assert!(matches!(err, DeployError::Build { stage: "build", .. }));
        assert!(store.present.borrow().contains("qaqcatz-mysql-env:env1"));

        // The retry reuses the cached env layer and the fetched artifact.
        let retry = BuildDriver::new(&store, &fetcher);
        let _ = retry.realize(&chain(dir.path())).unwrap_err();
        assert_eq!(store.builds.borrow().len(), 1);
        assert_eq!(*fetcher.calls.borrow(), 1);
    }

    #[test]
    fn realize_pull_step_pulls_missing_image_once() {
        let store = FakeStore::default();
        let fetcher = CountingFetcher::default();
        let driver = BuildDriver::new(&store, &fetcher);
        let steps = vec![BuildStep::Pull {
            image: ImageRef::new("mysql", "8.0.30"),
        }];

        let first = driver.realize(&steps).expect("first");
        let second = driver.realize(&steps).expect("second");
        assert_eq!(first[0].status, ImageStatus::Pulled);
        assert_eq!(second[0].status, ImageStatus::Cached);
        assert_eq!(*store.pulls.borrow(), vec!["mysql:8.0.30".to_string()]);
    }

    #[test]
    fn image_status_display_is_lowercase() {
        assert_eq!(ImageStatus::Cached.to_string(), "cached");
        assert_eq!(ImageStatus::Pulled.to_string(), "pulled");
    }
}

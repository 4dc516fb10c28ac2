//! Image cache seam.
//!
//! The build driver only needs three questions answered by the container
//! runtime: does `repo:tag` exist, build it from a context, pull it.

use std::path::Path;

use dbdeploy_common::error::Result;
use dbdeploy_common::types::ImageRef;

/// Local image cache of a container runtime.
pub trait ImageStore {
    /// Returns whether `image` is present locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be queried.
    fn image_exists(&self, image: &ImageRef) -> Result<bool>;

    /// Builds `image` from the Dockerfile in `context`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Build` if the build fails.
    fn build_image(&self, image: &ImageRef, context: &Path) -> Result<()>;

    /// Pulls `image` from its registry.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Build` if the pull fails.
    fn pull_image(&self, image: &ImageRef) -> Result<()>;
}

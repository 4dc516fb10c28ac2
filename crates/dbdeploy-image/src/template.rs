//! Build context preparation from shared Dockerfile templates.

use std::path::{Path, PathBuf};

use dbdeploy_common::constants::DOCKERFILE_NAME;
use dbdeploy_common::error::{DeployError, Result};

/// Copies the template Dockerfile at `source` into `context`.
///
/// The context directory is created if missing and an existing
/// `Dockerfile` in it is overwritten. Returns the path of the copy.
///
/// # Errors
///
/// Returns `DeployError::Build` if the template is missing or the copy fails.
pub fn copy_template(source: &Path, context: &Path) -> Result<PathBuf> {
    let fail = |message: String| DeployError::Build {
        image: context.display().to_string(),
        stage: "template",
        message,
    };

    if !source.is_file() {
        return Err(fail(format!("template {} does not exist", source.display())));
    }
    std::fs::create_dir_all(context).map_err(|e| fail(e.to_string()))?;

    let dest = context.join(DOCKERFILE_NAME);
    let _ = std::fs::copy(source, &dest)
        .map_err(|e| fail(format!("copy {}: {e}", source.display())))?;
    tracing::info!(template = %source.display(), context = %context.display(), "prepared build context");
    Ok(dest)
}

//! # dbdeploy-image
//!
//! Realizes the image side of a deployment plan.
//!
//! Handles:
//! - **Store**: The [`ImageStore`](store::ImageStore) seam over the container runtime's image cache.
//! - **Fetch**: Resumable artifact downloads into build contexts.
//! - **Hashing**: SHA-256 verification of downloaded artifacts.
//! - **Template**: Seeding a build context with a shared Dockerfile.
//! - **Builder**: Existence-idempotent, bottom-up realization of a build chain.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod fetch;
pub mod hash;
pub mod store;
pub mod template;

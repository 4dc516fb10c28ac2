//! # dbdeploy-catalog
//!
//! The DBMS release catalog and the pure queries over it.
//!
//! Handles:
//! - **Model**: DBMS entries and their ordered releases, build or pull shaped.
//! - **Catalog**: One-time JSON loading, validation and indexed lookup.
//! - **Resolver**: Turning `(dbms, release, port)` into a deployment [`Plan`](resolver::Plan).
//! - **Bisect**: Midpoint selection between two releases for regression narrowing.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod bisect;
pub mod catalog;
pub mod model;
pub mod resolver;

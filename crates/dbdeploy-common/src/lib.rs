//! # dbdeploy-common
//!
//! Shared types, error definitions, configuration models, constants and the
//! process execution facility used across the entire dbdeploy workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives every other crate builds upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

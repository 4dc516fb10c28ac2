//! Container lifecycle management for dbdeploy.
//!
//! Drives a resolved plan against a container runtime: realizes the image
//! chain, reconciles the container with the state machine, waits for the
//! DBMS to accept connections and runs one-shot initialization.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod engine;
pub mod lifecycle;
pub mod readiness;

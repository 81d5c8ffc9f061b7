// src/exec/mod.rs

//! Execution layer.
//!
//! - [`process`] runs one shell command for a command step, using
//!   `tokio::process::Command`.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `GraphExecutorBackend` the watch runtime uses in production, which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod process;

pub use backend::{ExecutorBackend, GraphExecutorBackend};

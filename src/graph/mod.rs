// src/graph/mod.rs

//! Task graph: named tasks, `series` / `parallel` composites and the
//! registry that owns them.
//!
//! - [`task`] defines the task tree.
//! - [`registry`] builds the tree from a validated config.
//! - [`invoke`] executes a tree and produces a [`BuildRun`].
//! - [`run`] holds the per-run state types.

pub mod invoke;
pub mod registry;
pub mod run;
pub mod task;

pub use invoke::{run_task, RunContext};
pub use registry::{TaskRegistry, BUILD_TRANSFORMS_TASK};
pub use run::{BuildRun, TaskOutcome, TaskState};
pub use task::{Task, TaskKind};

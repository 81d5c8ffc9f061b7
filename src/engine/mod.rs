// src/engine/mod.rs

//! Watch-mode orchestration engine.
//!
//! This module ties together:
//! - the re-run queue (what happens when a trigger arrives for a task that
//!   is already running)
//! - the main runtime event loop that reacts to:
//!   - startup / file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::graph::TaskOutcome;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Initial `build` when watch mode starts.
    Startup,
    /// Explicit request (CLI or tests).
    Manual,
    /// A watched file changed.
    FileWatch,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once nothing is in flight and no follow-up is pending.
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from the watcher, the executor, etc.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A task should be invoked.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A dispatched invocation finished.
    TaskFinished {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::RerunQueue;
pub use runtime::Runtime;

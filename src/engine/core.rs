// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - handing task names to the executor backend
//! - handling Ctrl+C / shutdown
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use std::collections::BTreeSet;

use crate::engine::event_handlers::{handle_task_finished, handle_task_trigger, CoreStep};
use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    known: BTreeSet<TaskName>,
    exclusive: BTreeSet<TaskName>,
    in_flight: BTreeSet<TaskName>,
    queue: RerunQueue,
    options: RuntimeOptions,
}

impl CoreRuntime {
    pub fn new<I, S>(known_tasks: I, options: RuntimeOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            known: known_tasks.into_iter().map(Into::into).collect(),
            exclusive: BTreeSet::new(),
            in_flight: BTreeSet::new(),
            queue: RerunQueue::new(),
            options,
        }
    }

    /// Mark tasks that must run alone: they wait for everything in flight,
    /// and everything else waits for them.
    pub fn with_exclusive<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.exclusive = tasks.into_iter().map(Into::into).collect();
        self
    }

    /// Nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_in_flight(&self, task: &str) -> bool {
        self.in_flight.contains(task)
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskTriggered { task, reason } => handle_task_trigger(
                &self.known,
                &self.exclusive,
                &mut self.in_flight,
                &mut self.queue,
                task,
                reason,
            ),
            RuntimeEvent::TaskFinished { task, outcome } => handle_task_finished(
                &self.exclusive,
                &mut self.in_flight,
                &mut self.queue,
                &self.options,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

// src/graph/run.rs

//! Per-invocation bookkeeping.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::transform::TransformError;

/// State of one task within a single run. No retries: a task moves forward
/// only, `Pending -> Running -> {Succeeded, Failed}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed(Vec<TransformError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    /// Every transform failure below the task, in child order.
    Failed(Vec<TransformError>),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded)
    }

    pub fn failures(&self) -> &[TransformError] {
        match self {
            TaskOutcome::Succeeded => &[],
            TaskOutcome::Failed(failures) => failures,
        }
    }
}

impl From<TaskOutcome> for TaskState {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Succeeded => TaskState::Succeeded,
            TaskOutcome::Failed(failures) => TaskState::Failed(failures),
        }
    }
}

/// Record of one top-level invocation.
#[derive(Debug, Clone)]
pub struct BuildRun {
    pub run_id: u64,
    pub root: String,
    pub states: BTreeMap<String, TaskState>,
    pub outcome: TaskOutcome,
    pub elapsed: Duration,
}

impl BuildRun {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn state_of(&self, task: &str) -> Option<&TaskState> {
        self.states.get(task)
    }
}

#[derive(Debug, Default)]
pub(crate) struct RunRecorder {
    states: Mutex<BTreeMap<String, TaskState>>,
}

impl RunRecorder {
    pub(crate) fn set(&self, task: &str, state: TaskState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(task.to_string(), state);
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<String, TaskState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

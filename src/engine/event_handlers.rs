// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::engine::queue::RerunQueue;
use crate::engine::{RuntimeOptions, TaskName, TriggerReason};
use crate::graph::TaskOutcome;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Invoke these tasks.
    DispatchTasks(Vec<TaskName>),
    /// Request that the process exits (when `exit_when_idle` is set).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }
}

/// Tasks that own the whole destination root (`build`, `clean`).
///
/// While one of them is in flight nothing else is dispatched, and one of
/// them is only dispatched once nothing else is in flight.
fn blocked(exclusive: &BTreeSet<TaskName>, in_flight: &BTreeSet<TaskName>, task: &str) -> bool {
    in_flight.iter().any(|t| exclusive.contains(t))
        || (exclusive.contains(task) && !in_flight.is_empty())
}

/// Handle a trigger.
///
/// - A task that is not in flight is dispatched right away, concurrently
///   with whatever else is running, unless an exclusive task holds the
///   destination root.
/// - A task that is in flight or blocked gets one pending follow-up; later
///   triggers coalesce into it.
pub fn handle_task_trigger(
    known: &BTreeSet<TaskName>,
    exclusive: &BTreeSet<TaskName>,
    in_flight: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if !known.contains(&task) {
        warn!(task = %task, ?reason, "trigger for unknown task ignored");
        return CoreStep::idle();
    }

    if in_flight.contains(&task) {
        queue.record(&task);
        return CoreStep::idle();
    }

    if blocked(exclusive, in_flight, &task) {
        debug!(task = %task, ?reason, "destination root busy; deferring task");
        queue.record(&task);
        return CoreStep::idle();
    }

    debug!(task = %task, ?reason, "dispatching task");
    in_flight.insert(task.clone());
    CoreStep {
        commands: vec![CoreCommand::DispatchTasks(vec![task])],
        keep_running: true,
    }
}

/// Handle the end of an invocation.
pub fn handle_task_finished(
    exclusive: &BTreeSet<TaskName>,
    in_flight: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
    options: &RuntimeOptions,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    match &outcome {
        TaskOutcome::Succeeded => info!(task = %task, "task finished"),
        TaskOutcome::Failed(failures) => {
            warn!(task = %task, failures = failures.len(), "task finished with failures")
        }
    }

    let mut commands = Vec::new();

    if !in_flight.remove(&task) {
        debug!(task = %task, "completion for task that was not in flight");
    }

    let ready = take_ready(exclusive, in_flight, queue);
    if !ready.is_empty() {
        debug!(tasks = ?ready, "dispatching pending follow-up runs");
        commands.push(CoreCommand::DispatchTasks(ready));
    }

    let mut keep_running = true;
    if options.exit_when_idle && in_flight.is_empty() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Move every pending task that may run now into `in_flight`. Exclusive
/// tasks are considered first so a queued `build` is not starved by a
/// stream of transform reruns.
fn take_ready(
    exclusive: &BTreeSet<TaskName>,
    in_flight: &mut BTreeSet<TaskName>,
    queue: &mut RerunQueue,
) -> Vec<TaskName> {
    let (first, rest): (Vec<TaskName>, Vec<TaskName>) = queue
        .pending()
        .map(str::to_string)
        .partition(|t| exclusive.contains(t));

    let mut ready = Vec::new();
    for task in first.into_iter().chain(rest) {
        if in_flight.contains(&task) || blocked(exclusive, in_flight, &task) {
            continue;
        }
        queue.take(&task);
        in_flight.insert(task.clone());
        ready.push(task);
    }
    ready
}

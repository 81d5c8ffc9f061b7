// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of invoking tasks
//! directly, so tests can swap in a fake executor that records dispatches
//! and controls when completions are reported.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName};
use crate::errors::Result;
use crate::graph::{run_task, RunContext, TaskRegistry};

/// Trait abstracting how dispatched tasks are invoked.
pub trait ExecutorBackend: Send {
    /// Start the given tasks. Implementations must eventually send one
    /// `RuntimeEvent::TaskFinished` per dispatched task.
    fn dispatch_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs tasks from the registry on spawned tokio tasks.
///
/// Invocations still running when the backend is dropped are aborted, which
/// kills their external commands.
pub struct GraphExecutorBackend {
    registry: Arc<TaskRegistry>,
    ctx: Arc<RunContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    running: JoinSet<()>,
}

impl GraphExecutorBackend {
    pub fn new(
        registry: Arc<TaskRegistry>,
        ctx: Arc<RunContext>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            registry,
            ctx,
            runtime_tx,
            running: JoinSet::new(),
        }
    }
}

impl ExecutorBackend for GraphExecutorBackend {
    fn dispatch_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            while self.running.try_join_next().is_some() {}

            for name in tasks {
                let task = self.registry.get(&name)?;
                let ctx = Arc::clone(&self.ctx);
                let tx = self.runtime_tx.clone();

                debug!(task = %name, "spawning task invocation");
                self.running.spawn(async move {
                    let run = run_task(task, ctx).await;
                    let finished = RuntimeEvent::TaskFinished {
                        task: name,
                        outcome: run.outcome,
                    };
                    if let Err(err) = tx.send(finished).await {
                        warn!("failed to send RuntimeEvent::TaskFinished: {err}");
                    }
                });
            }
            Ok(())
        })
    }
}

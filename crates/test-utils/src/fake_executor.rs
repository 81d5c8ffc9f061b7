use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetdag::engine::{RuntimeEvent, TaskName};
use assetdag::errors::Result;
use assetdag::exec::ExecutorBackend;
use assetdag::graph::TaskOutcome;
use tokio::sync::mpsc;

/// When the fake reports `TaskFinished` for a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Report success as soon as the task is dispatched.
    Immediate,
    /// Report nothing; the test sends `TaskFinished` itself.
    Manual,
}

/// A fake executor that:
/// - records which tasks were dispatched
/// - reports completion according to its [`Completion`] mode.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    dispatched: Arc<Mutex<Vec<TaskName>>>,
    completion: Completion,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        dispatched: Arc<Mutex<Vec<TaskName>>>,
        completion: Completion,
    ) -> Self {
        Self {
            runtime_tx,
            dispatched,
            completion,
        }
    }
}

impl ExecutorBackend for FakeExecutor {
    fn dispatch_tasks(
        &mut self,
        tasks: Vec<TaskName>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let dispatched = Arc::clone(&self.dispatched);
        let completion = self.completion;

        Box::pin(async move {
            for task in tasks {
                dispatched.lock().unwrap().push(task.clone());

                if completion == Completion::Immediate {
                    tx.send(RuntimeEvent::TaskFinished {
                        task,
                        outcome: TaskOutcome::Succeeded,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
                }
            }
            Ok(())
        })
    }
}

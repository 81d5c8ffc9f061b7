//! Scriptable operations for exercising the task graph without processes.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use assetdag::graph::Task;
use assetdag::transform::ops::CopyOperation;
use assetdag::transform::{
    Operation, OperationFuture, SourceGlob, Transform, TransformInput, WriteReport,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpEvent {
    Started(String),
    Finished(String),
}

/// Shared, ordered log of operation events.
#[derive(Debug, Clone, Default)]
pub struct OpLog {
    events: Arc<Mutex<Vec<(OpEvent, Instant)>>>,
}

impl OpLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: OpEvent) {
        self.events.lock().unwrap().push((event, Instant::now()));
    }

    pub fn events(&self) -> Vec<OpEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect()
    }

    /// Names of the operations that started, in start order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                OpEvent::Started(name) => Some(name),
                OpEvent::Finished(_) => None,
            })
            .collect()
    }

    pub fn started_count(&self, name: &str) -> usize {
        self.started().iter().filter(|n| n.as_str() == name).count()
    }

    pub fn instant_of(&self, event: &OpEvent) -> Option<Instant> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(e, _)| e == event)
            .map(|(_, at)| *at)
    }
}

/// Records start/finish, optionally sleeps, optionally fails.
#[derive(Debug)]
pub struct RecordingOperation {
    log: OpLog,
    delay: Duration,
    fail: bool,
}

impl RecordingOperation {
    pub fn new(log: &OpLog) -> Self {
        Self {
            log: log.clone(),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Operation for RecordingOperation {
    fn apply(&self, input: TransformInput) -> OperationFuture<'_> {
        Box::pin(async move {
            self.log.push(OpEvent::Started(input.transform.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.log.push(OpEvent::Finished(input.transform.clone()));
            if self.fail {
                anyhow::bail!("{} was told to fail", input.transform);
            }
            Ok(WriteReport::default())
        })
    }

    fn describe(&self) -> String {
        "recording".to_string()
    }
}

/// A transform task matching nothing under `/p/src`, driven by `op`.
pub fn leaf(name: &str, op: RecordingOperation) -> Arc<Task> {
    let glob = SourceGlob::from_pattern("/p/src", "*.none").expect("valid glob");
    Task::transform(Transform::new(name, glob, "/p/dist", Arc::new(op)))
}

/// A copy transform task from `root/pattern` into `dest`.
pub fn copy_leaf(name: &str, root: &std::path::Path, pattern: &str, dest: &std::path::Path) -> Arc<Task> {
    let glob = SourceGlob::from_pattern(root, pattern).expect("valid glob");
    Task::transform(Transform::new(name, glob, dest, Arc::new(CopyOperation)))
}

// src/graph/invoke.rs

//! Executing task trees.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::fs::FileSystem;
use crate::graph::run::{BuildRun, RunRecorder, TaskOutcome, TaskState};
use crate::graph::task::{Task, TaskKind};
use crate::report::Reporter;
use crate::transform::{Transform, TransformError};
use crate::types::BuildMode;

type OutcomeFuture = Pin<Box<dyn Future<Output = TaskOutcome> + Send + 'static>>;

/// Shared environment for every invocation.
#[derive(Debug)]
pub struct RunContext {
    pub fs: Arc<dyn FileSystem>,
    pub project_root: PathBuf,
    pub mode: BuildMode,
    pub reporter: Arc<dyn Reporter>,
    next_run_id: AtomicU64,
}

impl RunContext {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        project_root: impl Into<PathBuf>,
        mode: BuildMode,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            fs,
            project_root: project_root.into(),
            mode,
            reporter,
            next_run_id: AtomicU64::new(1),
        }
    }
}

/// Invoke `task` (and its whole subtree) once.
///
/// Never returns an error: failures are reported through the context's
/// reporter and collected in the returned [`BuildRun`].
pub async fn run_task(task: Arc<Task>, ctx: Arc<RunContext>) -> BuildRun {
    let run_id = ctx.next_run_id.fetch_add(1, Ordering::Relaxed);
    let recorder = Arc::new(RunRecorder::default());
    mark_pending(&task, &recorder);

    info!(run_id, task = %task.name(), "run started");
    let started = Instant::now();

    let outcome = invoke(Arc::clone(&task), ctx, Arc::clone(&recorder)).await;
    let elapsed = started.elapsed();

    match &outcome {
        TaskOutcome::Succeeded => {
            info!(run_id, task = %task.name(), elapsed_ms = elapsed.as_millis() as u64, "run succeeded");
        }
        TaskOutcome::Failed(failures) => {
            warn!(
                run_id,
                task = %task.name(),
                failures = failures.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "run failed"
            );
        }
    }

    BuildRun {
        run_id,
        root: task.name().to_string(),
        states: recorder.snapshot(),
        outcome,
        elapsed,
    }
}

fn mark_pending(task: &Task, recorder: &RunRecorder) {
    recorder.set(task.name(), TaskState::Pending);
    for child in task.children() {
        mark_pending(child, recorder);
    }
}

fn invoke(task: Arc<Task>, ctx: Arc<RunContext>, recorder: Arc<RunRecorder>) -> OutcomeFuture {
    Box::pin(async move {
        let _guard = task.run_lock().lock().await;
        recorder.set(task.name(), TaskState::Running);
        debug!(task = %task.name(), "task running");

        let outcome = match task.kind() {
            TaskKind::Transform(transform) => run_transform(transform, &ctx).await,
            TaskKind::Clean(dist) => run_clean(task.name(), dist, &ctx).await,
            TaskKind::Series(children) => run_series(children, &ctx, &recorder).await,
            TaskKind::Parallel(children) => run_parallel(children, &ctx, &recorder).await,
        };

        recorder.set(task.name(), outcome.clone().into());
        outcome
    })
}

async fn run_transform(transform: &Transform, ctx: &RunContext) -> TaskOutcome {
    ctx.reporter.transform_started(transform);
    match transform.run(ctx).await {
        Ok(report) => {
            ctx.reporter.transform_succeeded(transform, &report);
            TaskOutcome::Succeeded
        }
        Err(err) => {
            ctx.reporter.transform_failed(&err);
            TaskOutcome::Failed(vec![err])
        }
    }
}

async fn run_clean(name: &str, dist: &Path, ctx: &RunContext) -> TaskOutcome {
    let fs = Arc::clone(&ctx.fs);
    let target = dist.to_path_buf();
    let removed = tokio::task::spawn_blocking(move || fs.remove_dir_all(&target)).await;

    let result = match removed {
        Ok(res) => res.map_err(|e| format!("{e:#}")),
        Err(join_err) => Err(format!("clean worker failed: {join_err}")),
    };

    match result {
        Ok(()) => {
            info!(dist = ?dist, "destination root cleaned");
            TaskOutcome::Succeeded
        }
        Err(cause) => {
            let err = TransformError::new(name, cause);
            ctx.reporter.transform_failed(&err);
            TaskOutcome::Failed(vec![err])
        }
    }
}

async fn run_series(
    children: &[Arc<Task>],
    ctx: &Arc<RunContext>,
    recorder: &Arc<RunRecorder>,
) -> TaskOutcome {
    for child in children {
        let outcome = invoke(Arc::clone(child), Arc::clone(ctx), Arc::clone(recorder)).await;
        if !outcome.is_success() {
            debug!(task = %child.name(), "series child failed; skipping remaining children");
            return outcome;
        }
    }
    TaskOutcome::Succeeded
}

async fn run_parallel(
    children: &[Arc<Task>],
    ctx: &Arc<RunContext>,
    recorder: &Arc<RunRecorder>,
) -> TaskOutcome {
    let mut set = JoinSet::new();
    for (idx, child) in children.iter().enumerate() {
        let fut = invoke(Arc::clone(child), Arc::clone(ctx), Arc::clone(recorder));
        set.spawn(async move { (idx, fut.await) });
    }

    let mut results: Vec<Option<TaskOutcome>> = vec![None; children.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => results[idx] = Some(outcome),
            Err(join_err) => error!(error = %join_err, "parallel child did not complete"),
        }
    }

    let mut failures = Vec::new();
    for (child, result) in children.iter().zip(results) {
        match result {
            Some(TaskOutcome::Succeeded) => {}
            Some(TaskOutcome::Failed(errs)) => failures.extend(errs),
            None => failures.push(TransformError::new(child.name(), "child task panicked")),
        }
    }

    if failures.is_empty() {
        TaskOutcome::Succeeded
    } else {
        TaskOutcome::Failed(failures)
    }
}

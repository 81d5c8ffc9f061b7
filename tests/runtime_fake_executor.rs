// tests/runtime_fake_executor.rs

mod common;
use crate::common::fake_executor::{Completion, FakeExecutor};
use crate::common::init_tracing;

use std::error::Error;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use assetdag::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use assetdag::graph::TaskOutcome;

type TestResult = Result<(), Box<dyn Error>>;

fn trigger(task: &str, reason: TriggerReason) -> RuntimeEvent {
    RuntimeEvent::TaskTriggered {
        task: task.to_string(),
        reason,
    }
}

fn finished(task: &str) -> RuntimeEvent {
    RuntimeEvent::TaskFinished {
        task: task.to_string(),
        outcome: TaskOutcome::Succeeded,
    }
}

fn exit_when_idle() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

#[tokio::test]
async fn startup_build_runs_once_and_exits_when_idle() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Immediate);
    let core = CoreRuntime::new(["build", "css"], exit_when_idle());

    tx.send(trigger("build", TriggerReason::Startup)).await?;
    timeout(Duration::from_secs(5), Runtime::new(core, rx, executor).run()).await??;

    assert_eq!(*dispatched.lock().unwrap(), vec!["build"]);
    Ok(())
}

#[tokio::test]
async fn rapid_triggers_during_a_run_cause_exactly_one_follow_up() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Manual);
    let core = CoreRuntime::new(["css", "js"], exit_when_idle());

    tx.send(trigger("css", TriggerReason::FileWatch)).await?;
    for _ in 0..5 {
        tx.send(trigger("css", TriggerReason::FileWatch)).await?;
    }
    // First run completes; the five triggers above coalesce into one rerun.
    tx.send(finished("css")).await?;
    tx.send(finished("css")).await?;

    timeout(Duration::from_secs(5), Runtime::new(core, rx, executor).run()).await??;

    assert_eq!(*dispatched.lock().unwrap(), vec!["css", "css"]);
    Ok(())
}

#[tokio::test]
async fn different_tasks_run_concurrently() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Manual);
    let core = CoreRuntime::new(["css", "js"], exit_when_idle());

    tx.send(trigger("css", TriggerReason::FileWatch)).await?;
    tx.send(trigger("js", TriggerReason::FileWatch)).await?;
    tx.send(finished("js")).await?;
    tx.send(finished("css")).await?;

    timeout(Duration::from_secs(5), Runtime::new(core, rx, executor).run()).await??;

    // js was dispatched while css was still in flight.
    assert_eq!(*dispatched.lock().unwrap(), vec!["css", "js"]);
    Ok(())
}

#[tokio::test]
async fn unknown_task_triggers_are_ignored() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Immediate);
    let core = CoreRuntime::new(["css"], exit_when_idle());

    tx.send(trigger("nope", TriggerReason::Manual)).await?;
    tx.send(trigger("css", TriggerReason::Manual)).await?;
    timeout(Duration::from_secs(5), Runtime::new(core, rx, executor).run()).await??;

    assert_eq!(*dispatched.lock().unwrap(), vec!["css"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_the_runtime_with_work_in_flight() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(16);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Manual);
    let core = CoreRuntime::new(["build"], RuntimeOptions::default());

    tx.send(trigger("build", TriggerReason::Startup)).await?;
    tx.send(RuntimeEvent::ShutdownRequested).await?;
    timeout(Duration::from_secs(5), Runtime::new(core, rx, executor).run()).await??;

    assert_eq!(*dispatched.lock().unwrap(), vec!["build"]);
    Ok(())
}

async fn wait_for_dispatches(dispatched: &Arc<Mutex<Vec<String>>>, n: usize) {
    timeout(Duration::from_secs(5), async {
        while dispatched.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("dispatch did not happen in time");
}

#[tokio::test]
async fn file_triggers_wait_for_the_startup_build() -> TestResult {
    init_tracing();

    let (tx, rx) = mpsc::channel(64);
    let dispatched = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&dispatched), Completion::Manual);
    let core = CoreRuntime::new(["build", "clean", "css", "js"], exit_when_idle())
        .with_exclusive(["build", "clean"]);
    let runtime = tokio::spawn(Runtime::new(core, rx, executor).run());

    tx.send(trigger("build", TriggerReason::Startup)).await?;
    tx.send(trigger("css", TriggerReason::FileWatch)).await?;
    tx.send(trigger("js", TriggerReason::FileWatch)).await?;
    tx.send(trigger("css", TriggerReason::FileWatch)).await?;
    wait_for_dispatches(&dispatched, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*dispatched.lock().unwrap(), vec!["build"]);

    tx.send(finished("build")).await?;
    wait_for_dispatches(&dispatched, 3).await;
    assert_eq!(*dispatched.lock().unwrap(), vec!["build", "css", "js"]);

    tx.send(finished("css")).await?;
    tx.send(finished("js")).await?;
    timeout(Duration::from_secs(5), runtime).await???;
    Ok(())
}

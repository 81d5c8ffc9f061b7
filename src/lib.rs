// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod report;
pub mod server;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, project_root_of, ConfigFile};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, TriggerReason};
use crate::errors::{AssetdagError, Result};
use crate::exec::GraphExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{run_task, BuildRun, RunContext, TaskRegistry};
use crate::report::{FanoutReporter, LogReporter, Reporter};
use crate::server::{DevServer, ReloadHub, ServerConfig};
use crate::types::BuildMode;
use crate::watch::{build_bindings_from_config, spawn_watcher, WatchPaths};

/// High-level entry point used by `main.rs`.
///
/// Loads and validates the config, builds the task registry, then runs the
/// selected command.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let project_root = absolute_project_root(&config_path);
    let registry = Arc::new(TaskRegistry::from_config(&cfg, &project_root)?);
    let mode = BuildMode::from_flag(args.production);
    let command = args.command();

    debug!(root = ?project_root, mode = mode.as_str(), ?command, "configuration loaded");

    if args.dry_run {
        print_dry_run(&args, &cfg, &registry, &command, mode)?;
        return Ok(());
    }

    match command {
        Command::List => {
            print_task_list(&registry);
            Ok(())
        }
        Command::Build => {
            let ctx = Arc::new(default_context(&project_root, mode, Arc::new(LogReporter)));
            invoke_named(&registry, "build", ctx).await.map(|_| ())
        }
        Command::Task(argv) => {
            let name = task_name(&argv)?;
            let ctx = Arc::new(default_context(&project_root, mode, Arc::new(LogReporter)));
            invoke_named(&registry, name, ctx).await.map(|_| ())
        }
        Command::Watch => run_watch(&args, &cfg, registry, &project_root, mode).await,
    }
}

/// Invoke a registered task once; a failed run becomes `BuildFailed`.
pub async fn invoke_named(
    registry: &TaskRegistry,
    name: &str,
    ctx: Arc<RunContext>,
) -> Result<BuildRun> {
    let task = registry.get(name)?;
    let run = run_task(task, ctx).await;

    if run.is_success() {
        info!(task = %name, elapsed_ms = run.elapsed.as_millis() as u64, "done");
        Ok(run)
    } else {
        Err(AssetdagError::BuildFailed {
            task: name.to_string(),
            failures: run.outcome.failures().to_vec(),
        })
    }
}

fn default_context(project_root: &Path, mode: BuildMode, reporter: Arc<dyn Reporter>) -> RunContext {
    RunContext::new(Arc::new(RealFileSystem), project_root, mode, reporter)
}

fn task_name(argv: &[String]) -> Result<&str> {
    let Some(name) = argv.first() else {
        return Err(AssetdagError::TaskNotFound(String::new()));
    };
    if argv.len() > 1 {
        warn!(ignored = ?&argv[1..], "extra arguments after task name are ignored");
    }
    Ok(name)
}

fn absolute_project_root(config_path: &Path) -> PathBuf {
    let root = project_root_of(config_path);
    root.canonicalize().unwrap_or(root)
}

/// `watch`: `parallel(build, watcher loop, dev server)`.
///
/// The dev server is bound first so an unavailable port aborts before any
/// work starts.
async fn run_watch(
    args: &CliArgs,
    cfg: &ConfigFile,
    registry: Arc<TaskRegistry>,
    project_root: &Path,
    mode: BuildMode,
) -> Result<()> {
    let src_root = cfg.paths().src_under(project_root);
    let dist_root = cfg.paths().dist_under(project_root);

    let hub = ReloadHub::new();
    let reporters: Vec<Arc<dyn Reporter>> = vec![Arc::new(LogReporter), Arc::new(hub.clone())];
    let ctx = Arc::new(default_context(
        project_root,
        mode,
        Arc::new(FanoutReporter::new(reporters)),
    ));

    let server = if cfg.server().enabled && !args.no_server {
        let config = server_config(args, cfg, &dist_root);
        Some(DevServer::bind(&config, hub).await?)
    } else {
        None
    };

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    RealFileSystem.create_dir_all(&dist_root)?;
    let bindings = build_bindings_from_config(cfg)?;
    info!(bindings = bindings.len(), "watch bindings compiled");
    let _watcher = spawn_watcher(
        WatchPaths {
            src_root,
            dist_root,
            project_root: project_root.to_path_buf(),
        },
        bindings,
        rt_tx.clone(),
        cfg.watch_section().hash_storage,
    )?;

    let shutdown = Arc::new(Notify::new());
    let server_handle = server.map(|server| {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if let Err(err) = server.serve(async move { shutdown.notified().await }).await {
                error!(error = %format!("{err:#}"), "dev server stopped");
            }
        })
    });

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: "build".to_string(),
            reason: TriggerReason::Startup,
        })
        .await
        .map_err(|e| AssetdagError::Other(anyhow::anyhow!("runtime channel closed: {e}")))?;

    let core = CoreRuntime::new(registry.names(), RuntimeOptions::default())
        .with_exclusive(registry.cleaning_tasks());
    let executor = GraphExecutorBackend::new(Arc::clone(&registry), ctx, rt_tx);
    let result = Runtime::new(core, rt_rx, executor).run().await;

    shutdown.notify_one();
    if let Some(handle) = server_handle {
        if tokio::time::timeout(Duration::from_secs(2), handle).await.is_err() {
            debug!("dev server did not stop in time; abandoning it");
        }
    }

    result
}

fn server_config(args: &CliArgs, cfg: &ConfigFile, dist_root: &Path) -> ServerConfig {
    ServerConfig {
        host: args.host.clone().unwrap_or_else(|| cfg.server().host.clone()),
        port: args.port.unwrap_or(cfg.server().port),
        root_dir: dist_root.to_path_buf(),
    }
}

fn print_task_list(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.names().count());
    for task in registry.tasks() {
        println!("  - {}", task.describe());
        let children: Vec<&str> = task.children().iter().map(|c| c.name()).collect();
        if !children.is_empty() {
            println!("      children: {}", children.join(", "));
        }
    }
}

/// Print what the selected command would run.
fn print_dry_run(
    args: &CliArgs,
    cfg: &ConfigFile,
    registry: &TaskRegistry,
    command: &Command,
    mode: BuildMode,
) -> Result<()> {
    println!("assetdag dry-run");
    println!("  mode = {}", mode.as_str());
    println!();

    match command {
        Command::List => print_task_list(registry),
        Command::Build => print!("{}", registry.get("build")?.render_tree()),
        Command::Task(argv) => print!("{}", registry.get(task_name(argv)?)?.render_tree()),
        Command::Watch => {
            print!("{}", registry.get("build")?.render_tree());
            println!();
            println!("watch bindings:");
            for binding in build_bindings_from_config(cfg)? {
                println!(
                    "  - {} -> {}{}",
                    binding.pattern(),
                    binding.task(),
                    if binding.use_hash() { " (use_hash)" } else { "" }
                );
            }
            if cfg.server().enabled && !args.no_server {
                let config = server_config(args, cfg, &cfg.paths().dist_root);
                println!();
                println!("dev server: http://{}:{}", config.host, config.port);
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

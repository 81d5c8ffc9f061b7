// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{AssetdagError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::HashStorageMode;
use crate::watch::event_handler::{process_file_change, WatchContext};
use crate::watch::hash::{FileHashStore, HashStore, MemoryHashStore};
use crate::watch::patterns::WatchBinding;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping it stops file
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Where to watch and what to ignore.
#[derive(Debug, Clone)]
pub struct WatchPaths {
    /// Watched recursively; bindings match paths relative to it.
    pub src_root: PathBuf,
    /// Events under this directory (our own outputs) are dropped.
    pub dist_root: PathBuf,
    /// Holds `.assetdag/hashes` for file-backed hash storage.
    pub project_root: PathBuf,
}

/// Spawn a recursive watcher on the source root that sends
/// `RuntimeEvent::TaskTriggered` for every binding matching a changed path.
///
/// Failing to start observing (missing source root, watch limit reached)
/// is a `WatchError` and ends watch mode. Errors notify reports after that
/// are logged and observation continues.
pub fn spawn_watcher(
    paths: WatchPaths,
    bindings: Vec<WatchBinding>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    hash_storage_mode: HashStorageMode,
) -> Result<WatcherHandle> {
    let src_root = paths
        .src_root
        .canonicalize()
        .map_err(|e| AssetdagError::WatchError(format!("source root {:?}: {e}", paths.src_root)))?;
    let dist_root = paths
        .dist_root
        .canonicalize()
        .unwrap_or_else(|_| paths.dist_root.clone());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            // Receiver gone means the watch loop has ended.
            let _ = event_tx.send(res);
        },
        Config::default(),
    )?;

    watcher
        .watch(&src_root, RecursiveMode::Recursive)
        .map_err(|e| AssetdagError::WatchError(format!("watching {:?}: {e}", src_root)))?;
    info!("file watcher started on {:?}", src_root);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let mut hash_store: Box<dyn HashStore> = match hash_storage_mode {
        HashStorageMode::File => Box::new(FileHashStore::new(paths.project_root.clone(), Arc::clone(&fs))),
        HashStorageMode::Memory => Box::new(MemoryHashStore::new()),
    };

    let active: Vec<&str> = bindings.iter().map(|b| b.task()).collect();
    if let Err(e) = hash_store.prune(&active) {
        warn!("failed to prune stale hashes: {}", e);
    }

    let ctx = WatchContext {
        fs,
        root: src_root,
        bindings: Arc::new(bindings),
        hash_store: Arc::new(Mutex::new(hash_store)),
        runtime_tx,
    };

    tokio::spawn(async move {
        while let Some(res) = event_rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "file watch error");
                    continue;
                }
            };

            if matches!(event.kind, EventKind::Access(_)) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                if path.starts_with(&dist_root) {
                    continue;
                }
                if !process_file_change(&ctx, path).await {
                    debug!("runtime channel closed; stopping watcher loop");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_source_root_is_a_watch_error() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let paths = WatchPaths {
            src_root: dir.path().join("src"),
            dist_root: dir.path().join("dist"),
            project_root: dir.path().to_path_buf(),
        };

        let err = spawn_watcher(paths, Vec::new(), tx, HashStorageMode::Memory).unwrap_err();
        assert!(matches!(err, AssetdagError::WatchError(ref m) if m.contains("src")), "{err:?}");
    }
}

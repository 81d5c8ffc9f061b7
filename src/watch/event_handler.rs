// src/watch/event_handler.rs

//! Turning one changed path into task triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::{compute_hash_for_paths, HashStore};
use crate::watch::path_utils::src_relative;
use crate::watch::patterns::{collect_matching_files, WatchBinding};

/// Shared state for event processing.
pub struct WatchContext {
    pub fs: Arc<dyn FileSystem>,
    /// Source root; watch globs are relative to it.
    pub root: PathBuf,
    pub bindings: Arc<Vec<WatchBinding>>,
    pub hash_store: Arc<Mutex<Box<dyn HashStore>>>,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
}

/// Process a single changed path.
///
/// Every binding whose globs match gets a trigger, unless it uses content
/// hashing and its watched files are unchanged. Returns false once the
/// runtime channel is closed.
pub async fn process_file_change(ctx: &WatchContext, path: &Path) -> bool {
    let Some(rel_str) = src_relative(&ctx.root, path) else {
        debug!(?path, root = ?ctx.root, "path outside the source root; ignored");
        return true;
    };

    let matching: Vec<&WatchBinding> = ctx
        .bindings
        .iter()
        .filter(|b| b.matches(&rel_str))
        .collect();

    if matching.is_empty() {
        return true;
    }

    for binding in matching {
        if !should_trigger(ctx, &rel_str, binding).await {
            continue;
        }

        debug!(task = %binding.task(), path = %rel_str, "watch match -> triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task: binding.task().to_string(),
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = ctx.runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    true
}

/// Hash gate for `use_hash` bindings. Any error along the way triggers.
async fn should_trigger(ctx: &WatchContext, rel_path: &str, binding: &WatchBinding) -> bool {
    if !binding.use_hash() {
        return true;
    }

    let fs = Arc::clone(&ctx.fs);
    let root = ctx.root.clone();
    let binding = binding.clone();
    let hash_store = Arc::clone(&ctx.hash_store);
    let rel_path = rel_path.to_string();

    tokio::task::spawn_blocking(move || {
        let task = binding.task();

        let new_hash = match collect_matching_files(fs.as_ref(), &root, &binding)
            .and_then(|files| compute_hash_for_paths(fs.as_ref(), files))
        {
            Ok(h) => h,
            Err(err) => {
                warn!(task = %task, error = %err, "failed to hash watched files; triggering anyway");
                return true;
            }
        };

        let Ok(mut store) = hash_store.lock() else {
            warn!(task = %task, "hash store mutex poisoned; triggering anyway");
            return true;
        };

        match store.load(task) {
            Ok(Some(old)) if old == new_hash => {
                info!(task = %task, path = %rel_path, "watched content unchanged; skipping trigger");
                false
            }
            Ok(_) => {
                if let Err(err) = store.save(task, &new_hash) {
                    warn!(task = %task, error = %err, "failed to save binding hash");
                }
                true
            }
            Err(err) => {
                warn!(task = %task, error = %err, "failed to load binding hash; triggering anyway");
                true
            }
        }
    })
    .await
    .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::watch::hash::MemoryHashStore;

    fn ctx(fs: &MockFileSystem, bindings: Vec<WatchBinding>) -> (WatchContext, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let store: Box<dyn HashStore> = Box::new(MemoryHashStore::new());
        (
            WatchContext {
                fs: Arc::new(fs.clone()),
                root: PathBuf::from("/p/src"),
                bindings: Arc::new(bindings),
                hash_store: Arc::new(Mutex::new(store)),
                runtime_tx: tx,
            },
            rx,
        )
    }

    fn triggered(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(RuntimeEvent::TaskTriggered { task, .. }) = rx.try_recv() {
            out.push(task);
        }
        out
    }

    #[tokio::test]
    async fn every_matching_binding_is_triggered() {
        let fs = MockFileSystem::new();
        let (ctx, mut rx) = ctx(
            &fs,
            vec![
                WatchBinding::new("css", "scss/**/*.scss", &[], false).unwrap(),
                WatchBinding::new("lint", "**/*.scss", &[], false).unwrap(),
                WatchBinding::new("js", "js/*.js", &[], false).unwrap(),
            ],
        );

        process_file_change(&ctx, Path::new("/p/src/scss/a.scss")).await;
        assert_eq!(triggered(&mut rx), vec!["css", "lint"]);
    }

    #[tokio::test]
    async fn unchanged_content_is_skipped_with_use_hash() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/scss/a.scss", b"body {}");
        let (ctx, mut rx) = ctx(
            &fs,
            vec![WatchBinding::new("css", "scss/*.scss", &[], true).unwrap()],
        );
        let path = Path::new("/p/src/scss/a.scss");

        process_file_change(&ctx, path).await;
        fs.touch(path);
        process_file_change(&ctx, path).await;
        fs.add_file(path, b"body { color: red }");
        process_file_change(&ctx, path).await;

        assert_eq!(triggered(&mut rx), vec!["css", "css"]);
    }

    #[tokio::test]
    async fn paths_outside_root_are_ignored() {
        let fs = MockFileSystem::new();
        let (ctx, mut rx) = ctx(
            &fs,
            vec![WatchBinding::new("all", "**/*", &[], false).unwrap()],
        );
        assert!(process_file_change(&ctx, Path::new("/elsewhere/a.txt")).await);
        assert!(triggered(&mut rx).is_empty());
    }
}

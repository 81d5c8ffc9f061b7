// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::transform::resolve::build_globset;

/// Compiled watch/exclude globs and the task they re-run.
///
/// Patterns are relative to the source root; the watcher passes
/// root-relative paths (e.g. `"assets/scss/main.scss"`) into `matches`.
#[derive(Clone)]
pub struct WatchBinding {
    task: TaskName,
    pattern: String,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    use_hash: bool,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("task", &self.task)
            .field("pattern", &self.pattern)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(
        task: impl Into<TaskName>,
        pattern: &str,
        exclude: &[String],
        use_hash: bool,
    ) -> Result<Self> {
        let task = task.into();
        let watch_set = build_globset(&[pattern.to_string()])
            .with_context(|| format!("building watch globset for task {task}"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for task {task}"))?,
            )
        };

        Ok(Self {
            task,
            pattern: pattern.to_string(),
            watch_set,
            exclude_set,
            use_hash,
        })
    }

    /// Task re-run when this binding matches.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// One binding per transform with `watch = true`, using its category's
/// watch glob.
pub fn build_bindings_from_config(cfg: &ConfigFile) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::new();

    for (name, transform) in cfg.transforms() {
        if !transform.watch {
            continue;
        }
        let spec = cfg
            .paths()
            .spec(&transform.category)
            .with_context(|| format!("transform {name} has no category {}", transform.category))?;

        bindings.push(WatchBinding::new(
            name.clone(),
            &spec.watch_glob,
            &spec.exclude,
            cfg.effective_use_hash(transform),
        )?);
    }

    Ok(bindings)
}

/// Collect all files under `root` that a binding matches.
///
/// Used for aggregated hashes of `use_hash` bindings.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    binding: &WatchBinding,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(root) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if binding.matches(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

#![allow(dead_code, unused_imports)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::config::{load_and_validate, ConfigFile};
use assetdag::fs::RealFileSystem;
use assetdag::graph::{RunContext, TaskRegistry};
use assetdag::report::LogReporter;
use assetdag::types::BuildMode;

pub use assetdag_test_utils::{builders, fake_executor, init_tracing, ops, with_timeout};

pub const CONFIG_FILE: &str = "Assetdag.toml";

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Write `Assetdag.toml` into `root` and load it.
pub fn load_project(root: &Path, toml_src: &str) -> ConfigFile {
    let path = write_file(root, CONFIG_FILE, toml_src);
    load_and_validate(&path).unwrap()
}

pub fn registry_for(root: &Path, cfg: &ConfigFile) -> TaskRegistry {
    TaskRegistry::from_config(cfg, root).unwrap()
}

pub fn real_context(root: &Path, mode: BuildMode) -> Arc<RunContext> {
    Arc::new(RunContext::new(
        Arc::new(RealFileSystem),
        root,
        mode,
        Arc::new(LogReporter),
    ))
}

/// Sorted file paths under `dir`, relative to it, with `/` separators.
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap();
                out.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    out.sort();
    out
}

// src/watch/path_utils.rs

//! Mapping watcher event paths back onto the source root.

use std::path::{Path, PathBuf};

fn slash_joined(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Canonical form of `path`. Removed files cannot be canonicalized, so fall
/// back to the canonical parent joined with the file name.
fn canonical_or_parent(path: &Path) -> Option<PathBuf> {
    if let Ok(canon) = path.canonicalize() {
        return Some(canon);
    }
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

/// Path of `path` relative to the source root, with forward slashes, as
/// watch globs expect it (e.g. `"assets/scss/main.scss"`).
///
/// `None` when the path is outside the source root.
pub fn src_relative(src_root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(src_root) {
        return Some(slash_joined(rel));
    }

    // Event paths can carry a different absolute prefix than the root
    // (symlinked temp dirs, /private/var on macOS).
    let root = src_root.canonicalize().ok()?;
    let path = canonical_or_parent(path)?;
    path.strip_prefix(&root).ok().map(slash_joined)
}

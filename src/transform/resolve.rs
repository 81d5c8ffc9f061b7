// src/transform/resolve.rs

//! Source glob compilation and resolution.
//!
//! Resolution is never cached: a transform calls [`resolve`] on every
//! invocation because the source tree may have changed since the last run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;

/// Build a GlobSet from simple string patterns.
///
/// `*` and `?` never cross a `/`; use `**` for recursive matches.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Directory prefix of a glob that contains no glob syntax.
///
/// `"assets/scss/*.scss"` -> `"assets/scss"`, `"*.html"` -> `""`,
/// `"assets/images/**/*.png"` -> `"assets/images"`.
pub fn literal_prefix(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let dirs = &components[..components.len().saturating_sub(1)];

    let mut prefix = PathBuf::new();
    for comp in dirs {
        if comp.contains(['*', '?', '[', '{', '\\']) {
            break;
        }
        if comp.is_empty() || *comp == "." {
            continue;
        }
        prefix.push(comp);
    }
    prefix
}

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full path on disk.
    pub path: PathBuf,
    /// Path relative to the glob's base directory; outputs keep this shape.
    pub relative: PathBuf,
}

/// Deduplicated, path-sorted set of matched files.
pub type FileSet = Vec<SourceFile>;

/// Compiled source glob rooted at the source directory.
#[derive(Clone)]
pub struct SourceGlob {
    root: PathBuf,
    base: PathBuf,
    pattern: String,
    matcher: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for SourceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceGlob")
            .field("root", &self.root)
            .field("base", &self.base)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl SourceGlob {
    /// `pattern`, `base` and `exclude` are all relative to `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: &str,
        base: impl Into<PathBuf>,
        exclude: &[String],
    ) -> Result<Self> {
        let matcher = build_globset(&[pattern.to_string()])?;
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            root: root.into(),
            base: base.into(),
            pattern: pattern.to_string(),
            matcher,
            exclude,
        })
    }

    /// Glob with the base derived from the pattern's literal prefix.
    pub fn from_pattern(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        Self::new(root, pattern, literal_prefix(pattern), &[])
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_dir(&self) -> PathBuf {
        self.root.join(&self.base)
    }

    /// Whether a root-relative, `/`-separated path is selected.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.matcher.is_match(rel_path) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

/// Resolve a glob against the filesystem as it is right now.
///
/// A missing base directory resolves to an empty set.
pub fn resolve(fs: &dyn FileSystem, glob: &SourceGlob) -> Result<FileSet> {
    let base_dir = glob.base_dir();
    if !fs.is_dir(&base_dir) {
        debug!(pattern = %glob.pattern, base = ?base_dir, "glob base missing; nothing to resolve");
        return Ok(Vec::new());
    }

    let mut found: BTreeMap<PathBuf, SourceFile> = BTreeMap::new();
    let mut stack = vec![base_dir.clone()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Ok(rel) = path.strip_prefix(&glob.root) else {
                    continue;
                };
                let rel_str = rel.to_string_lossy().replace('\\', "/");
                if !glob.matches(&rel_str) {
                    continue;
                }
                let relative = path
                    .strip_prefix(&base_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| rel.to_path_buf());
                found.insert(path.clone(), SourceFile { path, relative });
            }
        }
    }

    debug!(pattern = %glob.pattern, matched = found.len(), "resolved source glob");
    Ok(found.into_values().collect())
}

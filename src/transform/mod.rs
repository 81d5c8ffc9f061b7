// src/transform/mod.rs

//! Transforms: a source glob, a destination directory and the operation that
//! turns one into the other.
//!
//! - [`resolve`] compiles and evaluates source globs.
//! - [`template`] expands `{placeholder}` command templates.
//! - [`ops`] holds the concrete operations (`copy`, `command`).

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::fs::FileSystem;
use crate::graph::RunContext;
use crate::types::BuildMode;

pub mod ops;
pub mod resolve;
pub mod template;

pub use resolve::{FileSet, SourceFile, SourceGlob};

/// A transform invocation failed. Never fatal on its own; composites decide
/// what happens next.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transform '{name}' failed: {cause}")]
pub struct TransformError {
    pub name: String,
    pub cause: String,
}

impl TransformError {
    pub fn new(name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cause: cause.into(),
        }
    }
}

/// Files written by one successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideEffects {
    pub writes_files: bool,
    pub notifies_reload: bool,
}

impl Default for SideEffects {
    fn default() -> Self {
        Self {
            writes_files: true,
            notifies_reload: true,
        }
    }
}

/// Everything an [`Operation`] needs for one invocation.
#[derive(Debug, Clone)]
pub struct TransformInput {
    pub transform: String,
    pub files: FileSet,
    pub dest_dir: PathBuf,
    /// Directory external commands run in (the project root).
    pub work_dir: PathBuf,
    pub mode: BuildMode,
    pub fs: Arc<dyn FileSystem>,
}

pub type OperationFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<WriteReport>> + Send + 'a>>;

/// The opaque work a transform performs on its matched files.
pub trait Operation: Send + Sync + fmt::Debug {
    fn apply(&self, input: TransformInput) -> OperationFuture<'_>;

    /// Output path (relative to the destination) produced for a source file,
    /// used by the `newer_only` filter. `None` when there is no 1:1 output.
    fn output_for(&self, relative: &Path) -> Option<PathBuf> {
        Some(relative.to_path_buf())
    }

    /// Short human-readable description for `list` / `--dry-run`.
    fn describe(&self) -> String;
}

#[derive(Debug)]
pub struct Transform {
    name: String,
    source: SourceGlob,
    dest_dir: PathBuf,
    operation: Arc<dyn Operation>,
    side_effects: SideEffects,
    newer_only: bool,
}

impl Transform {
    pub fn new(
        name: impl Into<String>,
        source: SourceGlob,
        dest_dir: impl Into<PathBuf>,
        operation: Arc<dyn Operation>,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            dest_dir: dest_dir.into(),
            operation,
            side_effects: SideEffects::default(),
            newer_only: false,
        }
    }

    pub fn with_reload(mut self, notifies_reload: bool) -> Self {
        self.side_effects.notifies_reload = notifies_reload;
        self
    }

    pub fn with_newer_only(mut self, newer_only: bool) -> Self {
        self.newer_only = newer_only;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &SourceGlob {
        &self.source
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }

    pub fn side_effects(&self) -> SideEffects {
        self.side_effects
    }

    pub fn newer_only(&self) -> bool {
        self.newer_only
    }

    /// Resolve the source glob and apply the `newer_only` filter.
    pub fn matched_files(&self, fs: &dyn FileSystem) -> anyhow::Result<FileSet> {
        let files = resolve::resolve(fs, &self.source)?;
        if !self.newer_only {
            return Ok(files);
        }

        let total = files.len();
        let fresh: FileSet = files
            .into_iter()
            .filter(|file| self.is_stale(fs, file))
            .collect();
        debug!(
            transform = %self.name,
            total,
            stale = fresh.len(),
            "applied newer_only filter"
        );
        Ok(fresh)
    }

    fn is_stale(&self, fs: &dyn FileSystem, file: &SourceFile) -> bool {
        let Some(out_rel) = self.operation.output_for(&file.relative) else {
            return true;
        };
        let output = self.dest_dir.join(out_rel);
        match (fs.modified(&file.path), fs.modified(&output)) {
            (Ok(src), Ok(out)) => src > out,
            _ => true,
        }
    }

    /// Resolve inputs and apply the operation once.
    pub async fn run(&self, ctx: &RunContext) -> Result<WriteReport, TransformError> {
        let files = self
            .matched_files(ctx.fs.as_ref())
            .map_err(|e| TransformError::new(&self.name, format!("{e:#}")))?;

        debug!(
            transform = %self.name,
            files = files.len(),
            dest = ?self.dest_dir,
            "applying transform"
        );

        let input = TransformInput {
            transform: self.name.clone(),
            files,
            dest_dir: self.dest_dir.clone(),
            work_dir: ctx.project_root.clone(),
            mode: ctx.mode,
            fs: Arc::clone(&ctx.fs),
        };

        self.operation
            .apply(input)
            .await
            .map_err(|e| TransformError::new(&self.name, format!("{e:#}")))
    }
}

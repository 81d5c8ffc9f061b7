// src/graph/task.rs

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::transform::Transform;

#[derive(Debug)]
pub enum TaskKind {
    /// Leaf wrapping one transform.
    Transform(Arc<Transform>),
    /// Built-in leaf that removes the destination root.
    Clean(PathBuf),
    /// Children run one after the other; the first failure stops the rest.
    Series(Vec<Arc<Task>>),
    /// Children run concurrently; every failure is collected.
    Parallel(Vec<Arc<Task>>),
}

/// Named, zero-argument unit of work.
///
/// Composites hold their children directly, so a task tree never needs the
/// registry once it is built.
pub struct Task {
    name: String,
    kind: TaskKind,
    /// Held for the duration of an invocation; a second invocation of the
    /// same task waits for the first one.
    run_lock: Mutex<()>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Task {
    fn new(name: impl Into<String>, kind: TaskKind) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            kind,
            run_lock: Mutex::new(()),
        })
    }

    pub fn transform(transform: Transform) -> Arc<Self> {
        let name = transform.name().to_string();
        Self::new(name, TaskKind::Transform(Arc::new(transform)))
    }

    pub fn clean(name: impl Into<String>, dist_root: impl Into<PathBuf>) -> Arc<Self> {
        Self::new(name, TaskKind::Clean(dist_root.into()))
    }

    pub fn series(name: impl Into<String>, children: Vec<Arc<Task>>) -> Arc<Self> {
        Self::new(name, TaskKind::Series(children))
    }

    pub fn parallel(name: impl Into<String>, children: Vec<Arc<Task>>) -> Arc<Self> {
        Self::new(name, TaskKind::Parallel(children))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn children(&self) -> &[Arc<Task>] {
        match &self.kind {
            TaskKind::Series(children) | TaskKind::Parallel(children) => children,
            TaskKind::Transform(_) | TaskKind::Clean(_) => &[],
        }
    }

    /// Whether `clean` runs somewhere in this task's tree.
    pub fn cleans_dist(&self) -> bool {
        matches!(self.kind, TaskKind::Clean(_)) || self.children().iter().any(|c| c.cleans_dist())
    }

    pub fn as_transform(&self) -> Option<&Arc<Transform>> {
        match &self.kind {
            TaskKind::Transform(t) => Some(t),
            _ => None,
        }
    }

    pub(crate) fn run_lock(&self) -> &Mutex<()> {
        &self.run_lock
    }

    /// One-line description of this node (children not included).
    pub fn describe(&self) -> String {
        match &self.kind {
            TaskKind::Transform(t) => format!(
                "{}: {} -> {} ({})",
                self.name,
                t.source().pattern(),
                t.dest_dir().display(),
                t.operation().describe()
            ),
            TaskKind::Clean(dist) => format!("{}: remove {}", self.name, dist.display()),
            TaskKind::Series(_) => format!("{} (series)", self.name),
            TaskKind::Parallel(_) => format!("{} (parallel)", self.name),
        }
    }

    /// Indented tree of this task and all of its descendants.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        let _ = writeln!(out, "{:indent$}{}", "", self.describe(), indent = depth * 2);
        for child in self.children() {
            child.write_tree(out, depth + 1);
        }
    }
}

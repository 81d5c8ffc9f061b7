// src/graph/registry.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::{CompositeConfig, ConfigFile, PathSpec, TransformConfig, TransformKind};
use crate::errors::{AssetdagError, Result};
use crate::graph::task::Task;
use crate::transform::ops::{CommandOperation, CopyOperation};
use crate::transform::{Operation, SourceGlob, Transform};

/// Name of the built-in parallel composite over every build transform.
pub const BUILD_TRANSFORMS_TASK: &str = "build:transforms";

/// Explicit name -> task table. Built once from configuration and passed to
/// whoever needs to look tasks up.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Arc<Task>) -> Result<()> {
        let name = task.name().to_string();
        if self.tasks.contains_key(&name) {
            return Err(AssetdagError::ConfigError(format!(
                "task '{}' is registered twice",
                name
            )));
        }
        debug!(task = %name, "registered task");
        self.tasks.insert(name, task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<Task>> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| AssetdagError::TaskNotFound(name.to_string()))
    }

    /// Tasks that remove the destination root when invoked. The watch
    /// runtime never runs them alongside anything else.
    pub fn cleaning_tasks(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .values()
            .filter(|t| t.cleans_dist())
            .map(|t| t.name())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks.values()
    }

    /// Build `clean`, every transform, `build` and the declared composites.
    ///
    /// `build` is `series(clean, parallel(<transforms with build = true>))`.
    pub fn from_config(cfg: &ConfigFile, project_root: &Path) -> Result<Self> {
        let src_root = cfg.paths().src_under(project_root);
        let dist_root = cfg.paths().dist_under(project_root);

        let mut registry = Self::new();

        let clean = Task::clean("clean", &dist_root);
        registry.register(Arc::clone(&clean))?;

        let mut build_children = Vec::new();
        for (name, tc) in cfg.transforms() {
            let spec = cfg.paths().spec(&tc.category).ok_or_else(|| {
                AssetdagError::ConfigError(format!(
                    "transform '{}' references unknown category '{}'",
                    name, tc.category
                ))
            })?;
            let task = Task::transform(build_transform(name, tc, spec, &src_root, &dist_root)?);
            if tc.build {
                build_children.push(Arc::clone(&task));
            }
            registry.register(task)?;
        }

        let all = Task::parallel(BUILD_TRANSFORMS_TASK, build_children);
        registry.register(Arc::clone(&all))?;
        registry.register(Task::series("build", vec![clean, all]))?;

        for name in composite_order(cfg.composites())? {
            let composite = &cfg.composites()[name];
            let children = composite
                .children()
                .iter()
                .map(|child| registry.get(child))
                .collect::<Result<Vec<_>>>()?;
            let task = if composite.is_series() {
                Task::series(name, children)
            } else {
                Task::parallel(name, children)
            };
            registry.register(task)?;
        }

        Ok(registry)
    }
}

fn build_transform(
    name: &str,
    tc: &TransformConfig,
    spec: &PathSpec,
    src_root: &Path,
    dist_root: &Path,
) -> Result<Transform> {
    let source = SourceGlob::new(src_root, &spec.source_glob, spec.base.clone(), &spec.exclude)
        .map_err(|e| {
            AssetdagError::ConfigError(format!("transform '{}': {:#}", name, e))
        })?;

    let operation: Arc<dyn Operation> = match tc.kind {
        TransformKind::Copy => Arc::new(CopyOperation),
        TransformKind::Command => Arc::new(CommandOperation::new(tc.steps.clone())),
    };

    Ok(
        Transform::new(name, source, dist_root.join(&spec.dest_dir), operation)
            .with_reload(tc.reload)
            .with_newer_only(tc.newer_only),
    )
}

/// Composite names ordered so that children come before their parents.
fn composite_order(composites: &BTreeMap<String, CompositeConfig>) -> Result<Vec<&str>> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in composites.keys() {
        graph.add_node(name.as_str());
    }
    for (name, composite) in composites {
        for child in composite.children() {
            if composites.contains_key(child) {
                graph.add_edge(child.as_str(), name.as_str(), ());
            }
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        AssetdagError::TaskCycle(format!(
            "cycle detected in composite tasks involving task '{}'",
            cycle.node_id()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::graph::task::TaskKind;

    fn config(extra: &str) -> ConfigFile {
        let src = format!(
            r#"
[category.css]
source = "scss/*.scss"
dest = "css"

[category.fonts]
source = "fonts/**/*"
dest = "fonts"

[transform.css]
category = "css"
[[transform.css.step]]
cmd = "sass {{input}} {{output}}"
ext = "css"

[transform.fonts]
category = "fonts"
kind = "copy"
{extra}
"#
        );
        let raw: RawConfigFile = toml::from_str(&src).unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn build_is_clean_then_parallel_transforms() {
        let registry = TaskRegistry::from_config(&config(""), Path::new("/p")).unwrap();
        let build = registry.get("build").unwrap();

        let TaskKind::Series(children) = build.kind() else {
            panic!("build should be a series");
        };
        assert_eq!(children[0].name(), "clean");
        let names: Vec<&str> = children[1].children().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["css", "fonts"]);
    }

    #[test]
    fn transforms_resolve_paths_against_project_root() {
        let registry = TaskRegistry::from_config(&config(""), Path::new("/p")).unwrap();
        let css = registry.get("css").unwrap();
        let transform = css.as_transform().unwrap();
        assert_eq!(transform.dest_dir(), Path::new("/p/dist/css"));
        assert_eq!(transform.source().base_dir(), Path::new("/p/src/scss"));
    }

    #[test]
    fn composites_share_child_tasks() {
        let registry = TaskRegistry::from_config(
            &config("[task.styles]\nseries = [\"css\"]\n[task.all]\nparallel = [\"styles\", \"fonts\"]\n"),
            Path::new("/p"),
        )
        .unwrap();

        let all = registry.get("all").unwrap();
        let styles = registry.get("styles").unwrap();
        assert!(Arc::ptr_eq(&all.children()[0], &styles));
        assert!(Arc::ptr_eq(&styles.children()[0], &registry.get("css").unwrap()));
    }

    #[test]
    fn build_false_excludes_transform_from_build() {
        let mut cfg_src = String::from("[transform.extra]\ncategory = \"fonts\"\nkind = \"copy\"\nbuild = false\n");
        cfg_src.push_str("[task.deploy]\nseries = [\"build\", \"extra\"]\n");
        let registry = TaskRegistry::from_config(&config(&cfg_src), Path::new("/p")).unwrap();

        let all = registry.get(BUILD_TRANSFORMS_TASK).unwrap();
        assert!(all.children().iter().all(|t| t.name() != "extra"));
        assert!(registry.get("extra").is_ok());
        assert_eq!(registry.get("deploy").unwrap().children()[0].name(), "build");
    }

    #[test]
    fn cleaning_tasks_include_every_composite_over_clean() {
        let cfg_src = "[task.deploy]\nseries = [\"build\", \"fonts\"]\n[task.styles]\nparallel = [\"css\"]\n";
        let registry = TaskRegistry::from_config(&config(cfg_src), Path::new("/p")).unwrap();

        let cleaning: Vec<&str> = registry.cleaning_tasks().collect();
        assert_eq!(cleaning, vec!["build", "clean", "deploy"]);
    }

    #[test]
    fn unknown_task_lookup_fails() {
        let registry = TaskRegistry::from_config(&config(""), Path::new("/p")).unwrap();
        assert!(matches!(
            registry.get("nope"),
            Err(AssetdagError::TaskNotFound(_))
        ));
    }
}

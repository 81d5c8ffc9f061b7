// src/config/validate.rs

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{
    CategoryConfig, ConfigFile, PathConfig, PathSpec, RawConfigFile, StepConfig, TransformConfig,
    TransformKind,
};
use crate::errors::{AssetdagError, Result};
use crate::transform::resolve::{build_globset, literal_prefix};
use crate::transform::template::placeholders;

/// Task names the orchestrator registers itself.
pub const RESERVED_TASK_NAMES: &[&str] = &["clean", "build", "watch"];

const PER_FILE_PLACEHOLDERS: &[&str] = &["input", "output", "dest", "name", "mode"];
const BATCH_PLACEHOLDERS: &[&str] = &["inputs", "output", "dest", "mode"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let paths = build_path_config(&raw);
        warn_on_overlapping_destinations(&paths);
        Ok(ConfigFile::new_unchecked(
            paths,
            raw.server,
            raw.watch,
            raw.transform,
            raw.task,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_transforms(cfg)?;
    validate_paths(cfg)?;
    validate_categories(cfg)?;
    validate_transforms(cfg)?;
    validate_task_names(cfg)?;
    validate_composites(cfg)?;
    validate_composite_graph(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn ensure_has_transforms(cfg: &RawConfigFile) -> Result<()> {
    if cfg.transform.is_empty() {
        return Err(config_error(
            "config must contain at least one [transform.<name>] section",
        ));
    }
    Ok(())
}

/// `clean` removes the destination root recursively, so it must never point
/// at the project itself or at the sources.
fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let dist = cfg.paths.dist.as_path();
    let src = cfg.paths.src.as_path();

    for (key, path) in [("dist", dist), ("src", src)] {
        if path.is_absolute() || path.has_root() {
            return Err(config_error(format!(
                "[paths].{} must be relative to the config file (got {:?})",
                key, path
            )));
        }
    }
    if dist.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(config_error(format!(
            "[paths].dist must not contain '..' (got {:?})",
            dist
        )));
    }

    let dist_norm = normalize(dist);
    if dist_norm.is_empty() {
        return Err(config_error(
            "[paths].dist must name a dedicated output directory (got the project root)",
        ));
    }
    if normalize(src).starts_with(&dist_norm) {
        return Err(config_error(format!(
            "[paths].dist {:?} must not contain [paths].src {:?}",
            dist, src
        )));
    }
    Ok(())
}

/// Lexical normal form of a project-relative path: `.` dropped, `..`
/// folded into its parent where one exists.
fn normalize(path: &Path) -> Vec<&OsStr> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else {
                    parts.push(OsStr::new(".."));
                }
            }
            other => parts.push(other.as_os_str()),
        }
    }
    parts
}

fn validate_categories(cfg: &RawConfigFile) -> Result<()> {
    for (name, category) in cfg.category.iter() {
        build_globset(std::slice::from_ref(&category.source)).map_err(|e| {
            config_error(format!("category '{}': invalid source glob: {:#}", name, e))
        })?;
        if let Some(ref watch) = category.watch {
            build_globset(std::slice::from_ref(watch)).map_err(|e| {
                config_error(format!("category '{}': invalid watch glob: {:#}", name, e))
            })?;
        }
        build_globset(&category.exclude).map_err(|e| {
            config_error(format!("category '{}': invalid exclude glob: {:#}", name, e))
        })?;
        if is_escaping(&category.dest) {
            return Err(config_error(format!(
                "category '{}': dest {:?} must stay inside [paths].dist",
                name, category.dest
            )));
        }
    }
    Ok(())
}

fn is_escaping(path: &Path) -> bool {
    path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
}

fn validate_transforms(cfg: &RawConfigFile) -> Result<()> {
    for (name, transform) in cfg.transform.iter() {
        if !cfg.category.contains_key(&transform.category) {
            return Err(config_error(format!(
                "transform '{}' references unknown category '{}'",
                name, transform.category
            )));
        }
        validate_transform_steps(name, transform)?;
    }
    Ok(())
}

fn validate_transform_steps(name: &str, transform: &TransformConfig) -> Result<()> {
    match transform.kind {
        TransformKind::Copy if !transform.steps.is_empty() => Err(config_error(format!(
            "transform '{}' is kind = \"copy\" and cannot declare steps",
            name
        ))),
        TransformKind::Copy => Ok(()),
        TransformKind::Command if transform.steps.is_empty() => Err(config_error(format!(
            "transform '{}' needs at least one [[transform.{}.step]]",
            name, name
        ))),
        TransformKind::Command => {
            for (idx, step) in transform.steps.iter().enumerate() {
                validate_step(name, idx, step)?;
            }
            Ok(())
        }
    }
}

fn validate_step(name: &str, idx: usize, step: &StepConfig) -> Result<()> {
    let allowed = if step.batch {
        BATCH_PLACEHOLDERS
    } else {
        PER_FILE_PLACEHOLDERS
    };

    let templates = std::iter::once(&step.cmd).chain(step.production_cmd.iter());
    for template in templates {
        for placeholder in placeholders(template) {
            if !allowed.contains(&placeholder.as_str()) {
                return Err(config_error(format!(
                    "transform '{}' step {}: unknown placeholder {{{}}} (allowed: {})",
                    name,
                    idx,
                    placeholder,
                    allowed.join(", ")
                )));
            }
            if placeholder == "output" {
                if step.batch && step.output.is_none() {
                    return Err(config_error(format!(
                        "transform '{}' step {}: batch step uses {{output}} but sets no `output`",
                        name, idx
                    )));
                }
                if !step.batch && step.ext.is_none() {
                    return Err(config_error(format!(
                        "transform '{}' step {}: per-file step uses {{output}} but sets no `ext`",
                        name, idx
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.transform.keys().chain(cfg.task.keys()) {
        if RESERVED_TASK_NAMES.contains(&name.as_str()) {
            return Err(config_error(format!(
                "'{}' is a reserved task name",
                name
            )));
        }
    }
    for name in cfg.task.keys() {
        if cfg.transform.contains_key(name) {
            return Err(config_error(format!(
                "task '{}' is declared both as a transform and as a composite",
                name
            )));
        }
    }
    Ok(())
}

fn validate_composites(cfg: &RawConfigFile) -> Result<()> {
    for (name, composite) in cfg.task.iter() {
        match (&composite.series, &composite.parallel) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(config_error(format!(
                    "task '{}' must set exactly one of `series` or `parallel`",
                    name
                )));
            }
            _ => {}
        }

        if composite.children().is_empty() {
            return Err(config_error(format!("task '{}' has no children", name)));
        }

        for child in composite.children() {
            if child == name {
                return Err(config_error(format!(
                    "task '{}' cannot contain itself",
                    name
                )));
            }
            let known = cfg.transform.contains_key(child)
                || cfg.task.contains_key(child)
                || child == "clean"
                || child == "build";
            if !known {
                return Err(config_error(format!(
                    "task '{}' has unknown child '{}'",
                    name, child
                )));
            }
        }
    }
    Ok(())
}

fn validate_composite_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: child -> composite, so a topological order builds
    // children before the composites that contain them.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, composite) in cfg.task.iter() {
        for child in composite.children() {
            if cfg.task.contains_key(child) {
                graph.add_edge(child.as_str(), name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(AssetdagError::TaskCycle(format!(
                "cycle detected in composite tasks involving task '{}'",
                node
            )))
        }
    }
}

fn build_path_config(cfg: &RawConfigFile) -> PathConfig {
    let specs: BTreeMap<String, PathSpec> = cfg
        .category
        .iter()
        .map(|(name, category)| (name.clone(), path_spec(name, category)))
        .collect();

    PathConfig {
        src_root: cfg.paths.src.clone(),
        dist_root: cfg.paths.dist.clone(),
        specs,
    }
}

fn path_spec(name: &str, category: &CategoryConfig) -> PathSpec {
    PathSpec {
        category: name.to_string(),
        source_glob: category.source.clone(),
        watch_glob: category
            .watch
            .clone()
            .unwrap_or_else(|| category.source.clone()),
        dest_dir: category.dest.clone(),
        base: category
            .base
            .clone()
            .unwrap_or_else(|| literal_prefix(&category.source)),
        exclude: category.exclude.clone(),
    }
}

fn warn_on_overlapping_destinations(paths: &PathConfig) {
    let specs: Vec<&PathSpec> = paths.specs.values().collect();
    for (i, a) in specs.iter().enumerate() {
        for b in specs.iter().skip(i + 1) {
            if a.dest_dir == b.dest_dir {
                warn!(
                    first = %a.category,
                    second = %b.category,
                    dest = ?a.dest_dir,
                    "categories share a destination directory; their outputs must not collide"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_src)?;
        ConfigFile::try_from(raw)
    }

    const BASE: &str = r#"
[category.css]
source = "assets/scss/*.scss"
watch = "assets/scss/**/*.scss"
dest = "assets/css"
"#;

    #[test]
    fn base_defaults_to_literal_prefix_of_source() {
        let cfg = parse(&format!(
            "{BASE}\n[transform.css]\ncategory = \"css\"\nkind = \"copy\"\n"
        ))
        .unwrap();
        let spec = cfg.paths().spec("css").unwrap();
        assert_eq!(spec.base, Path::new("assets/scss"));
        assert_eq!(spec.watch_glob, "assets/scss/**/*.scss");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = parse("[transform.js]\ncategory = \"js\"\nkind = \"copy\"\n").unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("unknown category")));
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let err = parse(&format!(
            "{BASE}\n[transform.css]\ncategory = \"css\"\n[[transform.css.step]]\ncmd = \"sass {{input}} {{target}}\"\next = \"css\"\n"
        ))
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("{target}")));
    }

    #[test]
    fn per_file_output_requires_ext() {
        let err = parse(&format!(
            "{BASE}\n[transform.css]\ncategory = \"css\"\n[[transform.css.step]]\ncmd = \"sass {{input}} {{output}}\"\n"
        ))
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("ext")));
    }

    #[test]
    fn dist_cannot_be_project_root() {
        let err = parse(&format!(
            "[paths]\ndist = \".\"\n{BASE}\n[transform.css]\ncategory = \"css\"\nkind = \"copy\"\n"
        ))
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(_)));
    }

    fn with_paths(src: &str, dist: &str) -> Result<ConfigFile> {
        parse(&format!(
            "[paths]\nsrc = {src:?}\ndist = {dist:?}\n{BASE}\n[transform.css]\ncategory = \"css\"\nkind = \"copy\"\n"
        ))
    }

    #[test]
    fn dist_containing_src_is_rejected_after_normalising() {
        for (src, dist) in [
            ("./src", "src"),
            ("src", "./src"),
            ("src/site", "./src/"),
            ("build/../src", "src"),
            ("src", "src"),
        ] {
            let err = with_paths(src, dist).unwrap_err();
            assert!(
                matches!(err, AssetdagError::ConfigError(ref m) if m.contains("must not contain")),
                "src={src} dist={dist}: {err:?}"
            );
        }
    }

    #[test]
    fn absolute_paths_are_rejected() {
        for (src, dist) in [("src", "/"), ("src", "/var/www"), ("/p/src", "dist")] {
            let err = with_paths(src, dist).unwrap_err();
            assert!(
                matches!(err, AssetdagError::ConfigError(ref m) if m.contains("relative")),
                "src={src} dist={dist}: {err:?}"
            );
        }
    }

    #[test]
    fn dist_normalising_to_project_root_is_rejected() {
        for dist in ["", "./", "./."] {
            assert!(with_paths("src", dist).is_err(), "dist={dist:?}");
        }
    }

    #[test]
    fn sibling_dist_and_nested_dist_are_accepted() {
        assert!(with_paths("./src", "./dist").is_ok());
        assert!(with_paths("src", "src-out").is_ok());
        assert!(with_paths("src", "src/dist").is_ok());
    }

    #[test]
    fn reserved_names_are_rejected() {
        let err = parse(&format!(
            "{BASE}\n[transform.build]\ncategory = \"css\"\nkind = \"copy\"\n"
        ))
        .unwrap_err();
        assert!(matches!(err, AssetdagError::ConfigError(ref m) if m.contains("reserved")));
    }

    #[test]
    fn composite_cycle_is_detected() {
        let err = parse(&format!(
            "{BASE}\n[transform.css]\ncategory = \"css\"\nkind = \"copy\"\n\
             [task.a]\nseries = [\"b\", \"css\"]\n[task.b]\nparallel = [\"a\"]\n"
        ))
        .unwrap_err();
        assert!(matches!(err, AssetdagError::TaskCycle(_)));
    }
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::HashStorageMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [paths]
/// src = "src"
/// dist = "dist"
///
/// [category.css]
/// source = "assets/scss/*.scss"
/// watch = "assets/scss/**/*.scss"
/// dest = "assets/css"
///
/// [transform.css]
/// category = "css"
///
/// [[transform.css.step]]
/// cmd = "sass {input} {output}"
/// ext = "css"
/// ```
///
/// Use `ConfigFile::try_from` (or `config::load_and_validate`) to obtain a
/// validated [`ConfigFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    /// Asset categories from `[category.<name>]`.
    #[serde(default)]
    pub category: BTreeMap<String, CategoryConfig>,

    /// Transforms from `[transform.<name>]`.
    #[serde(default)]
    pub transform: BTreeMap<String, TransformConfig>,

    /// User-declared composites from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, CompositeConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    paths: PathConfig,
    server: ServerSection,
    watch: WatchSection,
    transforms: BTreeMap<String, TransformConfig>,
    composites: BTreeMap<String, CompositeConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        paths: PathConfig,
        server: ServerSection,
        watch: WatchSection,
        transforms: BTreeMap<String, TransformConfig>,
        composites: BTreeMap<String, CompositeConfig>,
    ) -> Self {
        Self {
            paths,
            server,
            watch,
            transforms,
            composites,
        }
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn watch_section(&self) -> &WatchSection {
        &self.watch
    }

    pub fn transforms(&self) -> &BTreeMap<String, TransformConfig> {
        &self.transforms
    }

    pub fn composites(&self) -> &BTreeMap<String, CompositeConfig> {
        &self.composites
    }

    /// Effective `use_hash` for a transform's watch binding.
    pub fn effective_use_hash(&self, transform: &TransformConfig) -> bool {
        transform.use_hash.unwrap_or(self.watch.use_hash)
    }
}

/// `[paths]` section. Both roots are relative to the project root (the
/// directory holding the config file) unless absolute.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: default_dist(),
        }
    }
}

/// `[server]` section for the live-reload dev server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enabled: true,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    /// Only re-run a binding when the content hash of its watched files
    /// changed. Transforms can override this with `use_hash`.
    #[serde(default)]
    pub use_hash: bool,

    #[serde(default)]
    pub hash_storage: HashStorageMode,
}

/// `[category.<name>]` section: the raw form of a [`PathSpec`].
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Source glob, relative to `paths.src`.
    pub source: String,
    /// Watch glob, relative to `paths.src`. Defaults to `source`.
    #[serde(default)]
    pub watch: Option<String>,
    /// Destination directory, relative to `paths.dist`.
    #[serde(default)]
    pub dest: PathBuf,
    /// Directory (relative to `paths.src`) that output paths are made
    /// relative to. Defaults to the literal prefix of `source`.
    #[serde(default)]
    pub base: Option<PathBuf>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Validated per-category path mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub category: String,
    pub source_glob: String,
    pub watch_glob: String,
    pub dest_dir: PathBuf,
    pub base: PathBuf,
    pub exclude: Vec<String>,
}

/// Source root, destination root and the category table.
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub src_root: PathBuf,
    pub dist_root: PathBuf,
    pub specs: BTreeMap<String, PathSpec>,
}

impl PathConfig {
    pub fn spec(&self, category: &str) -> Option<&PathSpec> {
        self.specs.get(category)
    }

    /// Absolute source root for a given project root.
    pub fn src_under(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.src_root)
    }

    /// Absolute destination root for a given project root.
    pub fn dist_under(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.dist_root)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Run the configured command steps.
    #[default]
    Command,
    /// Copy matched files verbatim.
    Copy,
}

/// `[transform.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    pub category: String,

    #[serde(default)]
    pub kind: TransformKind,

    /// Ordered command steps (`[[transform.<name>.step]]`).
    #[serde(default, rename = "step")]
    pub steps: Vec<StepConfig>,

    /// Push a reload to dev-server clients after a successful run.
    #[serde(default = "default_true")]
    pub reload: bool,

    /// Only process sources newer than their existing output.
    #[serde(default)]
    pub newer_only: bool,

    /// Re-run this transform when its category's watch glob matches.
    #[serde(default = "default_true")]
    pub watch: bool,

    /// Include this transform in the default `build` task.
    #[serde(default = "default_true")]
    pub build: bool,

    /// Per-transform override of `[watch].use_hash`.
    #[serde(default)]
    pub use_hash: Option<bool>,
}

/// One `[[transform.<name>.step]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub cmd: String,

    /// Used instead of `cmd` under `--production`.
    #[serde(default)]
    pub production_cmd: Option<String>,

    /// Output extension for per-file steps (e.g. `"min.css"`).
    #[serde(default)]
    pub ext: Option<String>,

    /// Output file name (relative to the destination) for batch steps.
    #[serde(default)]
    pub output: Option<String>,

    /// Run once for the whole file set instead of once per file.
    #[serde(default)]
    pub batch: bool,
}

/// `[task.<name>]` section: a user-declared composite.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompositeConfig {
    #[serde(default)]
    pub series: Option<Vec<String>>,
    #[serde(default)]
    pub parallel: Option<Vec<String>>,
}

impl CompositeConfig {
    /// Child names regardless of combinator.
    pub fn children(&self) -> &[String] {
        self.series
            .as_deref()
            .or(self.parallel.as_deref())
            .unwrap_or(&[])
    }

    pub fn is_series(&self) -> bool {
        self.series.is_some()
    }
}

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetdag::config::{
    CategoryConfig, CompositeConfig, ConfigFile, PathsSection, RawConfigFile, ServerSection,
    StepConfig, TransformConfig, TransformKind, WatchSection,
};
use assetdag::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                paths: PathsSection::default(),
                server: ServerSection::default(),
                watch: WatchSection::default(),
                category: BTreeMap::new(),
                transform: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_paths(mut self, src: &str, dist: &str) -> Self {
        self.config.paths = PathsSection {
            src: PathBuf::from(src),
            dist: PathBuf::from(dist),
        };
        self
    }

    /// Category whose watch glob defaults to its source glob.
    pub fn with_category(mut self, name: &str, source: &str, dest: &str) -> Self {
        self.config.category.insert(
            name.to_string(),
            CategoryConfig {
                source: source.to_string(),
                watch: None,
                dest: PathBuf::from(dest),
                base: None,
                exclude: vec![],
            },
        );
        self
    }

    pub fn with_category_watch(mut self, name: &str, watch: &str) -> Self {
        if let Some(category) = self.config.category.get_mut(name) {
            category.watch = Some(watch.to_string());
        }
        self
    }

    pub fn with_category_exclude(mut self, name: &str, pattern: &str) -> Self {
        if let Some(category) = self.config.category.get_mut(name) {
            category.exclude.push(pattern.to_string());
        }
        self
    }

    pub fn with_transform(mut self, name: &str, transform: TransformConfig) -> Self {
        self.config.transform.insert(name.to_string(), transform);
        self
    }

    pub fn with_series(mut self, name: &str, children: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeConfig {
                series: Some(children.iter().map(|c| c.to_string()).collect()),
                parallel: None,
            },
        );
        self
    }

    pub fn with_parallel(mut self, name: &str, children: &[&str]) -> Self {
        self.config.task.insert(
            name.to_string(),
            CompositeConfig {
                series: None,
                parallel: Some(children.iter().map(|c| c.to_string()).collect()),
            },
        );
        self
    }

    pub fn with_default_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TransformConfig`.
pub struct TransformConfigBuilder {
    transform: TransformConfig,
}

impl TransformConfigBuilder {
    fn with_kind(category: &str, kind: TransformKind) -> Self {
        Self {
            transform: TransformConfig {
                category: category.to_string(),
                kind,
                steps: vec![],
                reload: true,
                newer_only: false,
                watch: true,
                build: true,
                use_hash: None,
            },
        }
    }

    pub fn copy(category: &str) -> Self {
        Self::with_kind(category, TransformKind::Copy)
    }

    pub fn command(category: &str) -> Self {
        Self::with_kind(category, TransformKind::Command)
    }

    /// Per-file step writing `<stem>.<ext>`.
    pub fn step(mut self, cmd: &str, ext: &str) -> Self {
        self.transform.steps.push(StepConfig {
            cmd: cmd.to_string(),
            production_cmd: None,
            ext: Some(ext.to_string()),
            output: None,
            batch: false,
        });
        self
    }

    /// Batch step writing a single `output` file.
    pub fn batch_step(mut self, cmd: &str, output: &str) -> Self {
        self.transform.steps.push(StepConfig {
            cmd: cmd.to_string(),
            production_cmd: None,
            ext: None,
            output: Some(output.to_string()),
            batch: true,
        });
        self
    }

    /// Production template for the most recently added step.
    pub fn production(mut self, cmd: &str) -> Self {
        if let Some(step) = self.transform.steps.last_mut() {
            step.production_cmd = Some(cmd.to_string());
        }
        self
    }

    pub fn reload(mut self, val: bool) -> Self {
        self.transform.reload = val;
        self
    }

    pub fn newer_only(mut self, val: bool) -> Self {
        self.transform.newer_only = val;
        self
    }

    pub fn watch(mut self, val: bool) -> Self {
        self.transform.watch = val;
        self
    }

    pub fn in_build(mut self, val: bool) -> Self {
        self.transform.build = val;
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.transform.use_hash = Some(val);
        self
    }

    pub fn build(self) -> TransformConfig {
        self.transform
    }
}

// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate categories, transforms and composites (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, project_root_of};
pub use model::{
    CategoryConfig, CompositeConfig, ConfigFile, PathConfig, PathSpec, PathsSection,
    RawConfigFile, ServerSection, StepConfig, TransformConfig, TransformKind, WatchSection,
};
pub use validate::RESERVED_TASK_NAMES;

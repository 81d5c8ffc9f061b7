// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::transform::TransformError;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("task '{task}' failed ({} transform failure(s))", failures.len())]
    BuildFailed {
        task: String,
        failures: Vec<TransformError>,
    },

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<notify::Error> for AssetdagError {
    fn from(err: notify::Error) -> Self {
        AssetdagError::WatchError(err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;

// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling per-transform watch bindings (`patterns`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optional content hashing so a binding only fires when its watched files
//!   actually changed.
//!
//! It does **not** know about composites; it only turns filesystem changes
//! into task-level triggers for the engine.

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_hash_for_paths, FileHashStore, HashStore, MemoryHashStore, HASH_FILE_PATH};
pub use patterns::{build_bindings_from_config, WatchBinding};
pub use watcher::{spawn_watcher, WatchPaths, WatcherHandle};

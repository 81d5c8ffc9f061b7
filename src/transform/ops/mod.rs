// src/transform/ops/mod.rs

//! Concrete [`Operation`](super::Operation) implementations.

pub mod command;
pub mod copy;

pub use command::CommandOperation;
pub use copy::CopyOperation;

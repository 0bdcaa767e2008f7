// src/dag/mod.rs

//! Task registry and series/parallel composition.
//!
//! - [`node`] holds the `Work` trait and the immutable `TaskNode` tree.
//! - [`registry`] maps names to work units and groups for one session.
//! - [`scheduler`] evaluates a tree: strict ordering for series, concurrent
//!   spawning for parallel.
//! - [`graph`] builds groups from the config.
//! - [`builtin`] names the leaf tasks every session provides.

pub mod builtin;
pub mod graph;
pub mod node;
pub mod registry;
pub mod scheduler;

pub use node::{work_fn, FnWork, TaskNode, Work};
pub use registry::{RegistryRef, TaskEntry, TaskRegistry};
pub use scheduler::run_once;

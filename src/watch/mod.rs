// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling watch globs (`patterns.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Matching events to bindings, optionally skipping modify events whose
//!   content hash is unchanged.
//! - The [`WatchReactor`] that owns the bindings and runs the engine loop.

use std::path::PathBuf;

pub mod event_handler;
pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod reactor;
pub mod watcher;

pub use patterns::{build_globset, glob_base, watch_scopes, WatchPattern, WatchScope};
pub use reactor::WatchReactor;
pub use watcher::{spawn_watcher, WatcherHandle};

/// Kinds of filesystem change that trigger bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Create,
    Modify,
    Remove,
}

/// One observed change; `paths` are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub paths: Vec<PathBuf>,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            kind,
            paths: paths.into_iter().collect(),
        }
    }
}

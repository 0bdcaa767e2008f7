// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task '{0}' is already defined")]
    DuplicateTask(String),

    #[error("Cycle detected in task groups: {0}")]
    GroupCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("{tool} failed on {path:?}: {diagnostic}")]
    Transform {
        tool: String,
        path: PathBuf,
        diagnostic: String,
    },

    #[error("Task '{task}' failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Task '{0}' was interrupted")]
    Interrupted(String),

    #[error("Port {0} is already in use")]
    PortInUse(u16),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;

// src/exec/mod.rs

//! External tool execution.
//!
//! Every asset transform (style compiler, autoprefixer, minifiers, image
//! optimizers) is an external program used as a stdin -> stdout filter via
//! `tokio::process::Command`. [`transform::Transform`] is the seam tests
//! replace with in-process fakes.

pub mod transform;

pub use transform::{transform_for, CommandTransform, Identity, Pipeline, Transform, SOURCE_ENV};

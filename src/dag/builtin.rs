// src/dag/builtin.rs

//! Names of the leaf tasks every session registers.

pub const COMPILE_STYLES: &str = "compileStyles";
pub const MINIFY_STYLES: &str = "minifyStyles";
pub const MINIFY_EACH_SCRIPT: &str = "minifyEachScript";
pub const CONCATENATE_AND_MINIFY: &str = "concatenateAndMinify";
pub const OPTIMIZE_IMAGES: &str = "optimizeImages";
pub const WATCH_FILES: &str = "watchFiles";
pub const DEV_SERVER: &str = "devServer";

/// Task run when the CLI is given no task name.
pub const DEFAULT_TASK: &str = "watch";

pub const BUILTIN_TASKS: &[&str] = &[
    COMPILE_STYLES,
    MINIFY_STYLES,
    MINIFY_EACH_SCRIPT,
    CONCATENATE_AND_MINIFY,
    OPTIMIZE_IMAGES,
    WATCH_FILES,
    DEV_SERVER,
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TASKS.contains(&name)
}

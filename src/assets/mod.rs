// src/assets/mod.rs

//! Built-in asset tasks: styles, scripts and images.
//!
//! Each task resolves its file set fresh on every run, pipes files through
//! the configured [`Transform`]s and writes the results through the
//! [`FileSystem`] seam. A file whose transform fails is reported and left
//! unwritten; the remaining files are still processed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, warn};

use crate::config::model::ConfigFile;
use crate::dag::builtin::{
    COMPILE_STYLES, CONCATENATE_AND_MINIFY, MINIFY_EACH_SCRIPT, MINIFY_STYLES, OPTIMIZE_IMAGES,
};
use crate::dag::node::work_fn;
use crate::dag::registry::TaskRegistry;
use crate::errors::{AssetdagError, Result};
use crate::exec::Transform;
use crate::fs::FileSystem;
use crate::server::livereload::LiveReload;

pub mod fileset;
pub mod images;
pub mod scripts;
pub mod styles;

pub use fileset::{FileSet, SourceFile};
pub use images::ImageTasks;
pub use scripts::ScriptTasks;
pub use styles::StyleTasks;

/// Everything an asset task needs besides its own configuration.
#[derive(Debug, Clone)]
pub struct AssetContext {
    /// Project root; all configured paths are relative to it.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    /// Set when a dev server is part of the session.
    pub reload: Option<LiveReload>,
    /// Server root relative to the project root, used to turn output paths
    /// into URL paths for `css` notices.
    pub serve_root: String,
}

impl AssetContext {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            reload: None,
            serve_root: ".".to_string(),
        }
    }

    pub fn with_reload(mut self, reload: LiveReload, serve_root: impl Into<String>) -> Self {
        self.reload = Some(reload);
        self.serve_root = serve_root.into();
        self
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn read(&self, rel: &str) -> Result<Vec<u8>> {
        Ok(self.fs.read(&self.path(rel))?)
    }

    pub fn write(&self, rel: &str, contents: &[u8]) -> Result<()> {
        Ok(self.fs.write(&self.path(rel), contents)?)
    }

    pub fn resolve(&self, patterns: &[String]) -> Result<FileSet> {
        FileSet::resolve(self.fs.as_ref(), &self.root, patterns)
    }

    /// URL path of a project-relative file, or `None` if it lies outside
    /// the served directory.
    pub fn served_path(&self, rel: &str) -> Option<String> {
        let base = self.serve_root.trim_matches('/');
        if base.is_empty() || base == "." {
            return Some(rel.to_string());
        }
        rel.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(str::to_string)
    }

    pub(crate) fn notify_css(&self, written: &[String]) {
        if let Some(reload) = &self.reload {
            let paths = written
                .iter()
                .filter_map(|rel| self.served_path(rel))
                .collect::<Vec<_>>();
            reload.notify_css(paths);
        }
    }

    pub(crate) fn notify_reload(&self) {
        if let Some(reload) = &self.reload {
            reload.reload();
        }
    }
}

/// Run `transform` over one file, attributing failures to `rel`.
pub(crate) async fn apply(
    transform: &dyn Transform,
    input: Vec<u8>,
    rel: &str,
) -> Result<Vec<u8>> {
    transform.apply(input, Path::new(rel)).await
}

/// Collects per-file failures of one task run.
#[derive(Debug)]
pub(crate) struct FileFailures {
    task: &'static str,
    failures: Vec<(String, AssetdagError)>,
}

impl FileFailures {
    pub(crate) fn new(task: &'static str) -> Self {
        Self {
            task,
            failures: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, rel: &str, err: AssetdagError) {
        error!(task = self.task, file = %rel, error = %err, "file failed; output left untouched");
        self.failures.push((rel.to_string(), err));
    }

    /// A single failure is returned as is; several become `TaskFailed`
    /// naming every broken file.
    pub(crate) fn finish(mut self) -> Result<()> {
        match self.failures.len() {
            0 => Ok(()),
            1 => Err(self.failures.remove(0).1),
            n => {
                let files = self
                    .failures
                    .iter()
                    .map(|(rel, _)| rel.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(AssetdagError::TaskFailed {
                    task: self.task.to_string(),
                    reason: format!("{n} files failed: {files}"),
                })
            }
        }
    }
}

pub(crate) fn warn_if_empty(task: &str, set: &FileSet, patterns: &[String]) {
    if set.is_empty() {
        warn!(task, ?patterns, "no files matched");
    }
}

/// Register the five asset tasks under their built-in names.
pub fn register_asset_tasks(
    registry: &mut TaskRegistry,
    cfg: &ConfigFile,
    ctx: &AssetContext,
) -> Result<()> {
    let styles = Arc::new(StyleTasks::from_config(cfg, ctx.clone()));
    let scripts = Arc::new(ScriptTasks::from_config(cfg, ctx.clone()));
    let images = Arc::new(ImageTasks::from_config(cfg, ctx.clone()));

    let s = Arc::clone(&styles);
    registry.define_task(
        COMPILE_STYLES,
        work_fn(move || {
            let s = Arc::clone(&s);
            async move { s.compile_styles().await }
        }),
    )?;

    let s = Arc::clone(&styles);
    registry.define_task(
        MINIFY_STYLES,
        work_fn(move || {
            let s = Arc::clone(&s);
            async move { s.minify_styles().await }
        }),
    )?;

    let js = Arc::clone(&scripts);
    registry.define_task(
        MINIFY_EACH_SCRIPT,
        work_fn(move || {
            let js = Arc::clone(&js);
            async move { js.minify_each_script().await }
        }),
    )?;

    let js = Arc::clone(&scripts);
    registry.define_task(
        CONCATENATE_AND_MINIFY,
        work_fn(move || {
            let js = Arc::clone(&js);
            async move { js.concatenate_and_minify().await }
        }),
    )?;

    registry.define_task(
        OPTIMIZE_IMAGES,
        work_fn(move || {
            let images = Arc::clone(&images);
            async move { images.optimize_images().await }
        }),
    )?;

    Ok(())
}

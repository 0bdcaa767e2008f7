// src/assets/styles.rs

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::assets::{apply, warn_if_empty, AssetContext, FileFailures};
use crate::config::model::{ConfigFile, StylesSection};
use crate::dag::builtin::{COMPILE_STYLES, MINIFY_STYLES};
use crate::errors::Result;
use crate::exec::{transform_for, Pipeline, Transform};

/// `compileStyles` and `minifyStyles`.
pub struct StyleTasks {
    ctx: AssetContext,
    section: StylesSection,
    compile: Arc<dyn Transform>,
    minify: Arc<dyn Transform>,
}

impl StyleTasks {
    pub fn new(
        ctx: AssetContext,
        section: StylesSection,
        compile: Arc<dyn Transform>,
        minify: Arc<dyn Transform>,
    ) -> Self {
        Self {
            ctx,
            section,
            compile,
            minify,
        }
    }

    /// Compiler and autoprefixer chained; minifier from `[tools]`.
    pub fn from_config(cfg: &ConfigFile, ctx: AssetContext) -> Self {
        let tools = cfg.tools();
        let compile = Pipeline::new(vec![
            transform_for(&tools.style_compiler, &ctx.root),
            transform_for(&tools.autoprefixer, &ctx.root),
        ]);
        let minify = transform_for(&tools.css_minifier, &ctx.root);
        Self::new(ctx, cfg.styles().clone(), Arc::new(compile), minify)
    }

    /// Where a compiled sheet lands: `out_dir/<path below glob base>.css`.
    pub fn output_path(&self, relative_to_base: &str) -> String {
        let css = Path::new(relative_to_base).with_extension("css");
        let css = css.to_string_lossy().replace('\\', "/");
        let out_dir = self.section.out_dir.trim_end_matches('/');
        if out_dir.is_empty() || out_dir == "." {
            css
        } else {
            format!("{out_dir}/{css}")
        }
    }

    pub async fn compile_styles(&self) -> Result<()> {
        let set = self.ctx.resolve(&self.section.source)?;
        warn_if_empty(COMPILE_STYLES, &set, &self.section.source);

        let mut failures = FileFailures::new(COMPILE_STYLES);
        let mut written = Vec::new();

        for file in set.files() {
            if file.file_name().starts_with('_') {
                debug!(file = %file.path, "skipping partial");
                continue;
            }
            let out = self.output_path(file.relative_to_base());
            let result = async {
                let input = self.ctx.read(&file.path)?;
                let css = apply(self.compile.as_ref(), input, &file.path).await?;
                self.ctx.write(&out, &css)
            }
            .await;

            match result {
                Ok(()) => {
                    debug!(source = %file.path, output = %out, "compiled style sheet");
                    written.push(out);
                }
                Err(err) => failures.record(&file.path, err),
            }
        }

        if !written.is_empty() {
            info!(count = written.len(), "compiled style sheets");
            self.ctx.notify_css(&written);
        }
        failures.finish()
    }

    pub async fn minify_styles(&self) -> Result<()> {
        let mut bundle = Vec::new();
        for rel in self.section.vendor.iter().chain(&self.section.bundle_inputs) {
            if !bundle.is_empty() {
                bundle.push(b'\n');
            }
            bundle.extend(self.ctx.read(rel)?);
        }

        let target = &self.section.bundle;
        let min = apply(self.minify.as_ref(), bundle, target).await?;
        self.ctx.write(target, &min)?;
        info!(task = MINIFY_STYLES, bundle = %target, bytes = min.len(), "wrote style bundle");

        self.ctx.notify_css(std::slice::from_ref(target));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Identity;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn output_path_keeps_subdirectories_and_swaps_extension() {
        let ctx = AssetContext::new(".", Arc::new(MockFileSystem::new()));
        let tasks = StyleTasks::new(
            ctx,
            StylesSection::default(),
            Arc::new(Identity),
            Arc::new(Identity),
        );
        assert_eq!(tasks.output_path("style.scss"), "css/style.css");
        assert_eq!(tasks.output_path("pages/home.scss"), "css/pages/home.css");
    }
}

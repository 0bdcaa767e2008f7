// src/assets/scripts.rs

use std::sync::Arc;

use tracing::{debug, info};

use crate::assets::{apply, warn_if_empty, AssetContext, FileFailures};
use crate::config::model::{ConfigFile, ScriptsSection};
use crate::dag::builtin::{CONCATENATE_AND_MINIFY, MINIFY_EACH_SCRIPT};
use crate::errors::Result;
use crate::exec::{transform_for, Transform};

/// `minifyEachScript` and `concatenateAndMinify`.
pub struct ScriptTasks {
    ctx: AssetContext,
    section: ScriptsSection,
    minify: Arc<dyn Transform>,
}

impl ScriptTasks {
    pub fn new(ctx: AssetContext, section: ScriptsSection, minify: Arc<dyn Transform>) -> Self {
        Self {
            ctx,
            section,
            minify,
        }
    }

    pub fn from_config(cfg: &ConfigFile, ctx: AssetContext) -> Self {
        let minify = transform_for(&cfg.tools().js_minifier, &ctx.root);
        Self::new(ctx, cfg.scripts().clone(), minify)
    }

    /// Minify every matched script in place.
    pub async fn minify_each_script(&self) -> Result<()> {
        let set = self.ctx.resolve(&self.section.source)?;
        warn_if_empty(MINIFY_EACH_SCRIPT, &set, &self.section.source);

        let mut failures = FileFailures::new(MINIFY_EACH_SCRIPT);
        let mut rewritten = 0usize;

        for file in set.files() {
            let result = async {
                let input = self.ctx.read(&file.path)?;
                let min = apply(self.minify.as_ref(), input, &file.path).await?;
                self.ctx.write(&file.path, &min)
            }
            .await;

            match result {
                Ok(()) => {
                    debug!(file = %file.path, "minified script");
                    rewritten += 1;
                }
                Err(err) => failures.record(&file.path, err),
            }
        }

        if rewritten > 0 {
            info!(count = rewritten, "minified scripts");
            self.ctx.notify_reload();
        }
        failures.finish()
    }

    /// Only the entry script makes it into the bundle.
    pub async fn concatenate_and_minify(&self) -> Result<()> {
        let entry = &self.section.entry;
        let input = self.ctx.read(entry)?;
        let min = apply(self.minify.as_ref(), input, entry).await?;
        self.ctx.write(&self.section.bundle, &min)?;
        info!(
            task = CONCATENATE_AND_MINIFY,
            entry = %entry,
            bundle = %self.section.bundle,
            "wrote script bundle"
        );
        Ok(())
    }
}

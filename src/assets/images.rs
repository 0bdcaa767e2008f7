// src/assets/images.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::assets::{apply, warn_if_empty, AssetContext, FileFailures};
use crate::config::model::ConfigFile;
use crate::dag::builtin::OPTIMIZE_IMAGES;
use crate::errors::Result;
use crate::exec::{transform_for, Transform};

/// `optimizeImages`: lossless, format-preserving, never grows a file.
pub struct ImageTasks {
    ctx: AssetContext,
    source: Vec<String>,
    optimizers: BTreeMap<String, Arc<dyn Transform>>,
}

/// What happened to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Replaced { before: usize, after: usize },
    Kept,
    NoOptimizer,
}

impl ImageTasks {
    pub fn new(
        ctx: AssetContext,
        source: Vec<String>,
        optimizers: BTreeMap<String, Arc<dyn Transform>>,
    ) -> Self {
        Self {
            ctx,
            source,
            optimizers,
        }
    }

    pub fn from_config(cfg: &ConfigFile, ctx: AssetContext) -> Self {
        let images = cfg.images();
        let optimizers = images
            .optimizers
            .iter()
            .map(|(ext, cmd)| (ext.clone(), transform_for(cmd, &ctx.root)))
            .collect();
        Self::new(ctx, images.source.clone(), optimizers)
    }

    async fn optimize_one(&self, rel: &str, ext: Option<String>) -> Result<Outcome> {
        let Some(optimizer) = ext.as_deref().and_then(|e| self.optimizers.get(e)) else {
            return Ok(Outcome::NoOptimizer);
        };

        let original = self.ctx.read(rel)?;
        let before = original.len();
        let optimized = apply(optimizer.as_ref(), original, rel).await?;
        let after = optimized.len();

        if after == 0 || after >= before {
            return Ok(Outcome::Kept);
        }
        self.ctx.write(rel, &optimized)?;
        Ok(Outcome::Replaced { before, after })
    }

    pub async fn optimize_images(&self) -> Result<()> {
        let set = self.ctx.resolve(&self.source)?;
        warn_if_empty(OPTIMIZE_IMAGES, &set, &self.source);

        let mut failures = FileFailures::new(OPTIMIZE_IMAGES);
        let mut replaced = 0usize;
        let mut saved = 0usize;

        for file in set.files() {
            match self.optimize_one(&file.path, file.extension()).await {
                Ok(Outcome::Replaced { before, after }) => {
                    debug!(file = %file.path, before, after, "optimized image");
                    replaced += 1;
                    saved += before - after;
                }
                Ok(Outcome::Kept) => debug!(file = %file.path, "already optimal"),
                Ok(Outcome::NoOptimizer) => debug!(file = %file.path, "no optimizer for extension"),
                Err(err) => failures.record(&file.path, err),
            }
        }

        info!(
            task = OPTIMIZE_IMAGES,
            total = set.len(),
            replaced,
            saved_bytes = saved,
            "optimized images"
        );
        failures.finish()
    }
}

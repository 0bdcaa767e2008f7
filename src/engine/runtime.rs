// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::registry::TaskRegistry;
use crate::dag::scheduler::run_once;
use crate::errors::{AssetdagError, Result};

use super::core::ReactorCore;
use super::{BindingId, CoreCommand, Reaction, ReactionOutcome, ReactorEvent};

/// One binding as seen by the runtime: a label for logs and its reaction.
#[derive(Debug, Clone)]
pub struct BoundReaction {
    pub label: String,
    pub reaction: Reaction,
}

/// Drives [`ReactorCore`] in response to [`ReactorEvent`]s and runs the
/// reactions it asks for.
///
/// Each invocation runs as its own Tokio task and reports back through the
/// same event channel, so slow reactions never block the loop.
pub struct ReactorRuntime {
    core: ReactorCore,
    reactions: Arc<Vec<BoundReaction>>,
    registry: Arc<TaskRegistry>,
    event_tx: mpsc::Sender<ReactorEvent>,
    event_rx: mpsc::Receiver<ReactorEvent>,
}

impl fmt::Debug for ReactorRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorRuntime")
            .field("core", &self.core)
            .field("reactions", &self.reactions)
            .finish_non_exhaustive()
    }
}

impl ReactorRuntime {
    pub fn new(
        core: ReactorCore,
        reactions: Vec<BoundReaction>,
        registry: Arc<TaskRegistry>,
        event_tx: mpsc::Sender<ReactorEvent>,
        event_rx: mpsc::Receiver<ReactorEvent>,
    ) -> Self {
        Self {
            core,
            reactions: Arc::new(reactions),
            registry,
            event_tx,
            event_rx,
        }
    }

    /// Main event loop; returns once shutdown was requested and every
    /// in-flight reaction has settled.
    pub async fn run(mut self) -> Result<()> {
        debug!(bindings = self.reactions.len(), "reactor loop started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "reactor received event");

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::Invoke(binding) => self.invoke(binding),
                }
            }

            if !step.keep_running {
                break;
            }
        }

        info!("watch reactor stopped");
        Ok(())
    }

    fn invoke(&self, binding: BindingId) {
        let Some(bound) = self.reactions.get(binding).cloned() else {
            return;
        };
        let registry = Arc::clone(&self.registry);
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            info!(pattern = %bound.label, reaction = %bound.reaction, "change detected");

            // Nested spawn so a panicking reaction still reports completion.
            let reaction = bound.reaction.clone();
            let joined = tokio::spawn(async move {
                match reaction {
                    Reaction::Task(node) => run_once(registry, node).await,
                    Reaction::Callback(work) => work.run().await,
                }
            })
            .await;

            let result = joined.unwrap_or_else(|e| {
                Err(AssetdagError::Other(anyhow::anyhow!("reaction panicked: {e}")))
            });
            let outcome = match result {
                Ok(()) => ReactionOutcome::Success,
                Err(err) => {
                    error!(pattern = %bound.label, error = %err, "reaction failed; still watching");
                    ReactionOutcome::Failed
                }
            };

            if tx
                .send(ReactorEvent::ReactionFinished { binding, outcome })
                .await
                .is_err()
            {
                debug!(binding, "reactor gone before reaction finished");
            }
        });
    }
}

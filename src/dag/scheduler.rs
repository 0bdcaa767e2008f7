// src/dag/scheduler.rs

//! Recursive evaluator for [`TaskNode`] trees.
//!
//! - `Series`: children run strictly in order; the first failure stops the
//!   sequence and is returned.
//! - `Parallel`: every child is spawned on the runtime before any is awaited.
//!   The node settles once all children settle and reports the first failure
//!   in completion order. Siblings of a failed child are not cancelled.

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::dag::node::TaskNode;
use crate::dag::registry::{TaskEntry, TaskRegistry};
use crate::errors::{AssetdagError, Result};
use crate::types::BoxFuture;

/// Run a (possibly composed) task to completion.
pub async fn run_once(registry: Arc<TaskRegistry>, node: TaskNode) -> Result<()> {
    run_node(registry, node).await
}

fn run_node(registry: Arc<TaskRegistry>, node: TaskNode) -> BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        match node {
            TaskNode::Leaf(name) => run_named(registry, name).await,
            TaskNode::Series(children) => {
                for child in children {
                    run_node(Arc::clone(&registry), child).await?;
                }
                Ok(())
            }
            TaskNode::Parallel(children) => run_parallel(registry, children).await,
        }
    })
}

async fn run_parallel(registry: Arc<TaskRegistry>, children: Vec<TaskNode>) -> Result<()> {
    let mut set = JoinSet::new();
    for child in children {
        set.spawn(run_node(Arc::clone(&registry), child));
    }

    let mut first_failure: Option<AssetdagError> = None;
    while let Some(joined) = set.join_next().await {
        let outcome = joined
            .map_err(|e| AssetdagError::Other(anyhow!("parallel branch panicked: {e}")))
            .and_then(|res| res);

        if let Err(err) = outcome {
            if first_failure.is_none() {
                first_failure = Some(err);
            } else {
                warn!(error = %err, "additional failure in parallel group");
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_named(registry: Arc<TaskRegistry>, name: String) -> Result<()> {
    let body = match registry.entry(&name) {
        Some(TaskEntry::Work(work)) => {
            let work = Arc::clone(work);
            Box::pin(async move { work.run().await }) as BoxFuture<'static, Result<()>>
        }
        Some(TaskEntry::Group(node)) => run_node(Arc::clone(&registry), node.clone()),
        None => return Err(AssetdagError::TaskNotFound(name)),
    };

    info!(task = %name, "Starting '{name}'");
    let started = Instant::now();
    let result = body.await;
    let elapsed = started.elapsed();

    match &result {
        Ok(()) => info!(task = %name, ?elapsed, "Finished '{name}'"),
        Err(err) => error!(task = %name, ?elapsed, error = %err, "'{name}' errored"),
    }
    result
}

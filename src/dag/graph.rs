// src/dag/graph.rs

//! Turn the `[group.*]` table of a validated config into registry groups.

use crate::config::model::{ConfigFile, GroupConfig};
use crate::dag::node::TaskNode;
use crate::dag::registry::TaskRegistry;
use crate::errors::Result;

/// Composition node for a single config group; members stay name references.
pub fn node_for_group(group: &GroupConfig) -> TaskNode {
    let leaves = group.members().iter().map(TaskNode::leaf);
    if group.series.is_some() {
        TaskNode::series(leaves)
    } else {
        TaskNode::parallel(leaves)
    }
}

/// Register every configured group. Built-in tasks must already be defined
/// for the groups to be runnable, but the order of registration is free.
pub fn register_groups(cfg: &ConfigFile, registry: &mut TaskRegistry) -> Result<()> {
    for (name, group) in cfg.groups() {
        registry.define_group(name.clone(), node_for_group(group))?;
    }
    Ok(())
}

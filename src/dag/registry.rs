// src/dag/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use crate::dag::node::{TaskNode, Work};
use crate::dag::scheduler::run_once;
use crate::errors::{AssetdagError, Result};
use crate::types::TaskName;

/// What a registered name stands for.
#[derive(Clone)]
pub enum TaskEntry {
    Work(Arc<dyn Work>),
    Group(TaskNode),
}

impl fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskEntry::Work(_) => f.write_str("Work(..)"),
            TaskEntry::Group(node) => write!(f, "Group({node})"),
        }
    }
}

/// Name -> task table for one build session.
///
/// Passed explicitly to whatever runs tasks; there is no process-wide
/// registry. Names are unique across tasks and groups.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: BTreeMap<TaskName, TaskEntry>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `work` under `name`.
    ///
    /// Fails with [`AssetdagError::DuplicateTask`] if the name is taken; the
    /// existing definition is kept.
    pub fn define_task(&mut self, name: impl Into<TaskName>, work: Arc<dyn Work>) -> Result<()> {
        self.insert(name.into(), TaskEntry::Work(work))
    }

    /// Register a composed group under `name`.
    ///
    /// Same duplicate rule as [`define_task`](Self::define_task). A group
    /// that (transitively) contains itself is rejected.
    pub fn define_group(&mut self, name: impl Into<TaskName>, node: TaskNode) -> Result<()> {
        let name = name.into();
        self.insert(name.clone(), TaskEntry::Group(node))?;

        let mut stack = Vec::new();
        if let Err(err) = self.check_acyclic(&name, &mut stack) {
            self.entries.remove(&name);
            return Err(err);
        }
        Ok(())
    }

    fn insert(&mut self, name: TaskName, entry: TaskEntry) -> Result<()> {
        if self.entries.contains_key(&name) {
            return Err(AssetdagError::DuplicateTask(name));
        }
        debug!(task = %name, ?entry, "registered task");
        self.entries.insert(name, entry);
        Ok(())
    }

    fn check_acyclic<'a>(&'a self, name: &'a str, stack: &mut Vec<&'a str>) -> Result<()> {
        if stack.contains(&name) {
            return Err(AssetdagError::GroupCycle(format!(
                "group '{}' contains itself via {}",
                name,
                stack.join(" -> ")
            )));
        }
        if let Some(TaskEntry::Group(node)) = self.entries.get(name) {
            stack.push(name);
            for leaf in node.leaf_names() {
                self.check_acyclic(leaf, stack)?;
            }
            stack.pop();
        }
        Ok(())
    }

    pub fn entry(&self, name: &str) -> Option<&TaskEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    /// Node that runs `name`, or `TaskNotFound`.
    pub fn resolve(&self, name: &str) -> Result<TaskNode> {
        if self.contains(name) {
            Ok(TaskNode::leaf(name))
        } else {
            Err(AssetdagError::TaskNotFound(name.to_string()))
        }
    }

    /// Whether running `node` would (transitively) invoke the task `task`.
    pub fn reaches(&self, node: &TaskNode, task: &str) -> bool {
        node.leaf_names().into_iter().any(|leaf| {
            leaf == task
                || matches!(
                    self.entries.get(leaf),
                    Some(TaskEntry::Group(inner)) if self.reaches(inner, task)
                )
        })
    }

    /// Run a registered task or group to completion.
    pub async fn run(self: &Arc<Self>, name: &str) -> Result<()> {
        let node = self.resolve(name)?;
        run_once(Arc::clone(self), node).await
    }
}

/// Late-bound handle to the registry a task is registered in.
///
/// Tasks that run other tasks (the watch reactor) are defined before the
/// registry is frozen into an `Arc`; [`bind`](Self::bind) closes the loop.
/// Only a weak reference is stored, so the registry is not kept alive by its
/// own tasks.
#[derive(Debug, Clone, Default)]
pub struct RegistryRef {
    inner: Arc<OnceLock<Weak<TaskRegistry>>>,
}

impl RegistryRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, registry: &Arc<TaskRegistry>) {
        if self.inner.set(Arc::downgrade(registry)).is_err() {
            debug!("registry handle already bound");
        }
    }

    pub fn get(&self) -> Result<Arc<TaskRegistry>> {
        self.inner
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| AssetdagError::Other(anyhow::anyhow!("task registry is not available")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::node::work_fn;

    fn noop() -> Arc<dyn Work> {
        work_fn(|| async { Ok(()) })
    }

    #[test]
    fn self_referencing_group_is_rejected_and_not_kept() {
        let mut reg = TaskRegistry::new();
        reg.define_task("a", noop()).unwrap();
        reg.define_group("g", TaskNode::series([TaskNode::leaf("a")]))
            .unwrap();
        let err = reg
            .define_group("h", TaskNode::series([TaskNode::leaf("h")]))
            .unwrap_err();
        assert!(matches!(err, AssetdagError::GroupCycle(_)));
        assert!(!reg.contains("h"));
    }

    #[test]
    fn reaches_follows_nested_groups() {
        let mut reg = TaskRegistry::new();
        reg.define_task("a", noop()).unwrap();
        reg.define_task("b", noop()).unwrap();
        reg.define_group("inner", TaskNode::series([TaskNode::leaf("a")]))
            .unwrap();
        let outer = TaskNode::parallel([TaskNode::leaf("inner")]);
        assert!(reg.reaches(&outer, "a"));
        assert!(!reg.reaches(&outer, "b"));
    }

    #[test]
    fn registry_ref_resolves_only_while_registry_lives() {
        let handle = RegistryRef::new();
        assert!(handle.get().is_err());

        let reg = Arc::new(TaskRegistry::new());
        handle.bind(&reg);
        assert!(handle.get().is_ok());

        drop(reg);
        assert!(handle.get().is_err());
    }
}

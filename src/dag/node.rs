// src/dag/node.rs

//! Units of work and the immutable composition tree built from them.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::errors::Result;
use crate::types::{BoxFuture, TaskName};

/// A unit of asynchronous work registered under a task name.
///
/// Implementations must be re-runnable: the same `Work` is invoked once per
/// build and once per matching watch event.
pub trait Work: Send + Sync {
    fn run(&self) -> BoxFuture<'_, Result<()>>;
}

/// Adapter turning a closure into a [`Work`].
pub struct FnWork<F>(F);

impl<F, Fut> Work for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn run(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin((self.0)())
    }
}

/// Wrap a closure returning a future as shareable [`Work`].
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn Work>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnWork(f))
}

/// Series/parallel composition tree.
///
/// Leaves refer to registered names (tasks or groups) and are resolved
/// against a `TaskRegistry` when the tree runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskNode {
    Leaf(TaskName),
    Series(Vec<TaskNode>),
    Parallel(Vec<TaskNode>),
}

impl TaskNode {
    pub fn leaf(name: impl Into<TaskName>) -> Self {
        TaskNode::Leaf(name.into())
    }

    pub fn series<I>(children: I) -> Self
    where
        I: IntoIterator<Item = TaskNode>,
    {
        TaskNode::Series(children.into_iter().collect())
    }

    pub fn parallel<I>(children: I) -> Self
    where
        I: IntoIterator<Item = TaskNode>,
    {
        TaskNode::Parallel(children.into_iter().collect())
    }

    /// Names referenced by leaves, left to right, without resolving groups.
    pub fn leaf_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaf_names(&mut out);
        out
    }

    fn collect_leaf_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TaskNode::Leaf(name) => out.push(name),
            TaskNode::Series(children) | TaskNode::Parallel(children) => {
                for child in children {
                    child.collect_leaf_names(out);
                }
            }
        }
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (label, children) = match self {
            TaskNode::Leaf(name) => return f.write_str(name),
            TaskNode::Series(children) => ("series", children),
            TaskNode::Parallel(children) => ("parallel", children),
        };
        write!(f, "{label}(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_nested_composition() {
        let node = TaskNode::parallel([
            TaskNode::series([TaskNode::leaf("a"), TaskNode::leaf("b")]),
            TaskNode::leaf("c"),
        ]);
        assert_eq!(node.to_string(), "parallel(series(a, b), c)");
        assert_eq!(node.leaf_names(), vec!["a", "b", "c"]);
    }
}

// src/engine/mod.rs

//! Watch reactor engine.
//!
//! This module ties together:
//! - the per-binding trigger queue (what happens when a change arrives while
//!   the binding's reaction is still running)
//! - the main event loop that reacts to:
//!   - watch triggers
//!   - reaction completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::sync::Arc;

use crate::dag::node::{TaskNode, Work};

/// Index of a watch binding, in registration order.
pub type BindingId = usize;

/// What a binding does when its pattern matches.
#[derive(Clone)]
pub enum Reaction {
    /// Run a (possibly composed) task through the registry.
    Task(TaskNode),
    /// Run an ad-hoc unit of work, e.g. a live-reload notification.
    Callback(Arc<dyn Work>),
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Task(node) => write!(f, "Task({node})"),
            Reaction::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl fmt::Display for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reaction::Task(node) => write!(f, "{node}"),
            Reaction::Callback(_) => f.write_str("<callback>"),
        }
    }
}

/// Outcome of one reaction invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    Success,
    Failed,
}

/// Events flowing into the reactor loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorEvent {
    /// A filesystem change matched this binding.
    BindingTriggered { binding: BindingId },
    /// An invocation of the binding's reaction settled.
    ReactionFinished {
        binding: BindingId,
        outcome: ReactionOutcome,
    },
    /// Stop observing; in-flight reactions are allowed to finish.
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::ReactorCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::BindingQueue;
pub use runtime::ReactorRuntime;

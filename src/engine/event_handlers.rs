// src/engine/event_handlers.rs

//! Event handling logic for the reactor core.

use tracing::debug;

use crate::engine::queue::BindingQueue;
use crate::engine::BindingId;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start one invocation of the binding's reaction.
    Invoke(BindingId),
}

/// Decision returned by the core after handling a single `ReactorEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub(crate) fn cont(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Per-binding state tracked by the core.
#[derive(Debug, Clone)]
pub struct BindingState {
    pub running: bool,
    pub queue: BindingQueue,
}

/// A binding matched a change.
///
/// - Idle binding: start an invocation right away.
/// - Busy binding: hand the trigger to its queue.
pub fn handle_trigger(state: &mut BindingState, binding: BindingId) -> Vec<CoreCommand> {
    if state.running {
        debug!(binding, "binding busy; recording trigger");
        state.queue.record_trigger();
        return Vec::new();
    }
    state.running = true;
    vec![CoreCommand::Invoke(binding)]
}

/// An invocation settled; start the next queued one if there is one.
///
/// While shutting down, queued triggers are discarded instead.
pub fn handle_finished(
    state: &mut BindingState,
    binding: BindingId,
    shutting_down: bool,
) -> Vec<CoreCommand> {
    if !state.running {
        debug!(binding, "completion for idle binding ignored");
        return Vec::new();
    }
    if shutting_down {
        state.queue.clear();
    }
    if state.queue.take() {
        debug!(binding, remaining = state.queue.len(), "starting queued invocation");
        return vec![CoreCommand::Invoke(binding)];
    }
    state.running = false;
    Vec::new()
}

// src/engine/core.rs

//! Pure reactor state machine.
//!
//! Consumes [`ReactorEvent`]s and produces:
//! - an updated per-binding state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::ReactorRuntime`) is responsible for
//! reading events from the channel, spawning reactions and reporting their
//! completion back. The core has no channels, no Tokio types, and does no
//! IO, so it is tested directly.

use tracing::warn;

use crate::engine::event_handlers::{
    handle_finished, handle_trigger, BindingState, CoreCommand, CoreStep,
};
use crate::engine::queue::BindingQueue;
use crate::engine::{BindingId, ReactorEvent};
use crate::types::TriggerWhileRunningBehaviour;

#[derive(Debug)]
pub struct ReactorCore {
    bindings: Vec<BindingState>,
    shutting_down: bool,
}

impl ReactorCore {
    pub fn new(
        binding_count: usize,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        let state = BindingState {
            running: false,
            queue: BindingQueue::new(behaviour, queue_length),
        };
        Self {
            bindings: vec![state; binding_count],
            shutting_down: false,
        }
    }

    pub fn is_running(&self, binding: BindingId) -> bool {
        self.bindings.get(binding).is_some_and(|b| b.running)
    }

    pub fn pending(&self, binding: BindingId) -> usize {
        self.bindings.get(binding).map_or(0, |b| b.queue.len())
    }

    /// True when no reaction is running.
    pub fn is_idle(&self) -> bool {
        self.bindings.iter().all(|b| !b.running)
    }

    pub fn step(&mut self, event: ReactorEvent) -> CoreStep {
        match event {
            ReactorEvent::BindingTriggered { binding } => {
                if self.shutting_down {
                    return self.settle(Vec::new());
                }
                let Some(state) = self.bindings.get_mut(binding) else {
                    warn!(binding, "trigger for unknown binding ignored");
                    return CoreStep::cont(Vec::new());
                };
                CoreStep::cont(handle_trigger(state, binding))
            }
            ReactorEvent::ReactionFinished { binding, .. } => {
                let shutting_down = self.shutting_down;
                let commands = match self.bindings.get_mut(binding) {
                    Some(state) => handle_finished(state, binding, shutting_down),
                    None => Vec::new(),
                };
                self.settle(commands)
            }
            ReactorEvent::ShutdownRequested => {
                self.shutting_down = true;
                for state in &mut self.bindings {
                    state.queue.clear();
                }
                self.settle(Vec::new())
            }
        }
    }

    /// Once shutting down, stop as soon as the last reaction settles.
    fn settle(&self, commands: Vec<CoreCommand>) -> CoreStep {
        CoreStep {
            commands,
            keep_running: !(self.shutting_down && self.is_idle()),
        }
    }
}

// src/engine/queue.rs

use tracing::{debug, warn};

use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrived while a binding's reaction was running.
///
/// Every pending trigger is identical (it means "run the reaction once
/// more"), so the queue only needs to count them.
///
/// - `Queue`: each trigger is kept, up to `max_pending`. A trigger that
///   would overflow the queue evicts the oldest pending one.
/// - `Cancel`: pending triggers collapse to the latest one.
#[derive(Debug, Clone)]
pub struct BindingQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_pending: usize,
    pending: usize,
}

impl BindingQueue {
    /// `max_pending` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_pending: usize) -> Self {
        Self {
            behaviour,
            max_pending: max_pending.max(1),
            pending: 0,
        }
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    pub fn len(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Remember a trigger for after the current invocation.
    pub fn record_trigger(&mut self) {
        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if self.pending == self.max_pending {
                    warn!(
                        max_pending = self.max_pending,
                        "watch queue full; dropping oldest pending trigger"
                    );
                } else {
                    self.pending += 1;
                }
                debug!(pending = self.pending, "queued trigger (queue mode)");
            }
            TriggerWhileRunningBehaviour::Cancel => {
                self.pending = 1;
                debug!("collapsed pending triggers to latest (cancel mode)");
            }
        }
    }

    /// Take one pending trigger, if any.
    pub fn take(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn clear(&mut self) {
        self.pending = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_is_bounded() {
        let mut q = BindingQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        for _ in 0..5 {
            q.record_trigger();
        }
        assert_eq!(q.len(), 2);
        assert!(q.take());
        assert!(q.take());
        assert!(!q.take());
    }

    #[test]
    fn cancel_mode_keeps_one() {
        let mut q = BindingQueue::new(TriggerWhileRunningBehaviour::Cancel, 16);
        q.record_trigger();
        q.record_trigger();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = BindingQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger();
        assert_eq!(q.len(), 1);
    }
}

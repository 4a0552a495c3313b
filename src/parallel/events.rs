//! Queue notifications
//!
//! Subscribers get their own unbounded crossbeam receiver. Sending never blocks,
//! which lets the queue emit while it still holds its state lock.

use crossbeam::channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    TaskStarted {
        id: String,
        display_name: String,
    },
    TaskCompleted {
        id: String,
        output_path: Option<PathBuf>,
        duration_seconds: f64,
    },
    TaskFailed {
        id: String,
        display_name: String,
        error_message: String,
    },
    /// Emitted after each task settles while others are still outstanding
    Progress { settled: usize, total: usize },
    /// Emitted exactly once per run, after every task is terminal
    Finished {
        total: usize,
        successful: usize,
        total_duration: f64,
    },
}

impl QueueEvent {
    pub fn task_id(&self) -> Option<&str> {
        match self {
            QueueEvent::TaskStarted { id, .. }
            | QueueEvent::TaskCompleted { id, .. }
            | QueueEvent::TaskFailed { id, .. } => Some(id),
            QueueEvent::Progress { .. } | QueueEvent::Finished { .. } => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, QueueEvent::Finished { .. })
    }
}

/// Fan-out of events to every live subscriber
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<QueueEvent>>>,
}

impl EventBus {
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver to every subscriber, forgetting the ones whose receiver is gone
    pub fn emit(&self, event: QueueEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        tracing::trace!("queue event: {:?}", event);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

//! Domain events: decoupled notification of index and query activity.
//!
//! Publishing never blocks and never fails; with no subscribers events are
//! dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A synchronization pass for a course completed and was persisted
    IndexSynchronized {
        course: String,
        added: usize,
        replaced: usize,
        removed: usize,
        node_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A document vanished from disk and its nodes were removed
    DocumentPruned {
        course: String,
        doc_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A capability was executed inside a reasoning session
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A query reached a terminal state
    QueryCompleted {
        course: String,
        /// "answered", "unanswerable", "exhausted" or "fault"
        outcome: String,
        iterations: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

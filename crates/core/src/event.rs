//! Domain event system — how read-only views learn that state changed.
//!
//! The store publishes an event after every applied mutation and the
//! controller publishes turn boundaries. Form and chat views subscribe and
//! re-read a snapshot; they never mutate through the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::message::Sender;
use crate::record::FieldName;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A message was appended to a transcript
    MessageAppended {
        conversation_id: String,
        sender: Sender,
        position: usize,
        timestamp: DateTime<Utc>,
    },

    /// A single field was patched
    FieldPatched {
        conversation_id: String,
        field: FieldName,
        timestamp: DateTime<Utc>,
    },

    /// Several fields were merged as a full fill
    RecordFilled {
        conversation_id: String,
        fields: Vec<FieldName>,
        timestamp: DateTime<Utc>,
    },

    /// An extraction was rejected and the record left untouched
    MergeRejected {
        conversation_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A request to the assistant was issued
    TurnStarted {
        conversation_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The in-flight request settled (either way)
    TurnSettled {
        conversation_id: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

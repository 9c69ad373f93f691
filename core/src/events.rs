//! Event bus: fan-out notifications for state changes (§4.8). Each
//! subscriber gets its own bounded queue; a slow subscriber drops its
//! oldest unread event rather than blocking the publisher or other
//! subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-subscriber queue depth before drop-oldest kicks in.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TaskCreated { task_id: String },
    TaskUpdated { task_id: String },
    TaskStatusChanged { task_id: String, from: String, to: String },
    TaskAssigned { task_id: String, agent_id: String },
    IntentPosted { task_id: String, agent_id: String },
    ClaimCreated { agent_id: String, files: Vec<String> },
    ClaimConflict { agent_id: String, conflicts_with: Vec<String> },
    ClaimReleased { agent_id: String, files: Vec<String> },
    ClaimExtended { agent_id: String, expires_at: String },
    EvidenceAttached { task_id: String, agent_id: String },
    ChangelogAppended { task_id: Option<String>, agent_id: String, file_path: String },
    ComplianceEvaluated { task_id: String, agent_id: String, compliant: bool },
    AgentRegistered { agent_id: String },
    AgentHeartbeat { agent_id: String },
}

/// A bounded, multi-subscriber broadcast of [`Event`]s. `tokio::sync::broadcast`
/// already implements drop-oldest-on-overflow per lagging receiver, which is
/// exactly the semantics the component needs (component in §2).
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers notified; a
    /// return of 0 is not an error, it just means nobody is listening.
    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

//! Event types for the lead services event system
//!
//! Provides the shared event definitions and the broadcast EventBus used to
//! feed SSE clients and any in-process listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Domain events
///
/// Events are broadcast via EventBus and serialized with a `type` tag for SSE
/// transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BcpEvent {
    /// A new agent was registered or an existing profile was replaced
    AgentRegistered {
        agent_id: Uuid,
        display_name: String,
        timestamp: DateTime<Utc>,
    },

    /// Agent availability changed (active, busy, vacation)
    AgentStatusChanged {
        agent_id: Uuid,
        old_status: String,
        new_status: String,
        timestamp: DateTime<Utc>,
    },

    /// A lead import finished
    LeadsImported {
        imported: usize,
        duplicates: usize,
        rejected: usize,
        timestamp: DateTime<Utc>,
    },

    /// A lead was committed to an agent
    LeadAssigned {
        lead_id: Uuid,
        agent_id: Uuid,
        territory_id: String,
        score: f64,
        timestamp: DateTime<Utc>,
    },

    /// A lead could not be assigned and stays in the queue
    LeadUnassigned {
        lead_id: Uuid,
        territory_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A lead moved through its sales pipeline
    LeadStatusChanged {
        lead_id: Uuid,
        old_status: String,
        new_status: String,
        timestamp: DateTime<Utc>,
    },

    /// An assignment batch finished
    AssignmentBatchCompleted {
        successful: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl BcpEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            BcpEvent::AgentRegistered { .. } => "AgentRegistered",
            BcpEvent::AgentStatusChanged { .. } => "AgentStatusChanged",
            BcpEvent::LeadsImported { .. } => "LeadsImported",
            BcpEvent::LeadAssigned { .. } => "LeadAssigned",
            BcpEvent::LeadUnassigned { .. } => "LeadUnassigned",
            BcpEvent::LeadStatusChanged { .. } => "LeadStatusChanged",
            BcpEvent::AssignmentBatchCompleted { .. } => "AssignmentBatchCompleted",
        }
    }
}

/// Broadcast bus for BcpEvent
///
/// Cloning shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BcpEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BcpEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BcpEvent) -> Result<usize, broadcast::error::SendError<BcpEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BcpEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClientId, QueueId, QueueStatus, UserId};

/// Stable event protocol emitted after each committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEvent {
    /// Queue aggregate was created
    Created {
        queue_id: QueueId,
        organization_id: String,
        at: DateTime<Utc>,
    },

    /// Client was admitted
    Joined {
        queue_id: QueueId,
        client_id: ClientId,
        user_id: UserId,
        position: u32,
        at: DateTime<Utc>,
    },

    /// Client at the front was promoted to the called slot
    Called {
        queue_id: QueueId,
        client_id: ClientId,
        at: DateTime<Utc>,
    },

    /// Called client was served and removed
    Served {
        queue_id: QueueId,
        client_id: ClientId,
        ticket: u64,
        at: DateTime<Utc>,
    },

    /// Client left voluntarily; `credited` when they were already called
    Left {
        queue_id: QueueId,
        client_id: ClientId,
        user_id: UserId,
        credited: bool,
        at: DateTime<Utc>,
    },

    /// Staff changed the queue status
    StatusChanged {
        queue_id: QueueId,
        from: QueueStatus,
        to: QueueStatus,
        at: DateTime<Utc>,
    },
}

impl QueueEvent {
    /// Get event type name as string
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Joined { .. } => "joined",
            Self::Called { .. } => "called",
            Self::Served { .. } => "served",
            Self::Left { .. } => "left",
            Self::StatusChanged { .. } => "status_changed",
        }
    }

    pub fn queue_id(&self) -> &QueueId {
        match self {
            Self::Created { queue_id, .. }
            | Self::Joined { queue_id, .. }
            | Self::Called { queue_id, .. }
            | Self::Served { queue_id, .. }
            | Self::Left { queue_id, .. }
            | Self::StatusChanged { queue_id, .. } => queue_id,
        }
    }

    /// Get the timestamp from any event
    pub fn timestamp(&self) -> &DateTime<Utc> {
        match self {
            Self::Created { at, .. }
            | Self::Joined { at, .. }
            | Self::Called { at, .. }
            | Self::Served { at, .. }
            | Self::Left { at, .. }
            | Self::StatusChanged { at, .. } => at,
        }
    }
}

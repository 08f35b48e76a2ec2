use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ClientId, ClientStatus, QueueId, QueueStatus, UserId};

/// Roster invariant violations detected by [`Queue::check_invariants`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("entry {client_id} at index {index} has position {position}")]
    PositionMismatch {
        client_id: ClientId,
        index: usize,
        position: u32,
    },

    #[error("entry {client_id} is stored with terminal status {status}")]
    TerminalEntry { client_id: ClientId, status: ClientStatus },

    #[error("{count} entries hold the called slot")]
    MultipleCalled { count: usize },

    #[error("called entry {client_id} is not at the front of the roster")]
    CalledNotAtFront { client_id: ClientId },

    #[error("current number {current_number} differs from total served {total_served}")]
    CounterDrift { current_number: u64, total_served: u64 },
}

/// One admitted client, embedded in the queue roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueClient {
    pub id: ClientId,

    pub user_id: UserId,

    /// Display snapshot taken at admission
    pub user_name: String,

    /// Contact snapshot taken at admission
    pub user_phone: String,

    /// 1-based rank, always roster index + 1
    pub position: u32,

    pub joined_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_at: Option<DateTime<Utc>>,

    /// Local clock time ("HH:MM") at which the client is expected to be served
    pub estimated_time: String,

    /// Instant behind `estimated_time`
    pub estimated_at: DateTime<Utc>,

    pub status: ClientStatus,
}

impl QueueClient {
    pub fn is_waiting(&self) -> bool {
        self.status == ClientStatus::Waiting
    }

    pub fn is_called(&self) -> bool {
        self.status == ClientStatus::Called
    }
}

/// Input for creating a queue aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueue {
    pub service_id: String,
    pub organization_id: String,
    /// Minutes per client
    pub estimated_wait_time: u32,
}

/// The queue aggregate: the unit of transactional consistency.
///
/// Everything a mutating operation needs lives in this one document, so a
/// single read-modify-write against the store is enough to keep the roster,
/// the counters and the status consistent with each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    pub id: QueueId,

    pub service_id: String,

    pub organization_id: String,

    pub status: QueueStatus,

    /// Display ticket number, advanced once per served client
    pub current_number: u64,

    /// Lifetime count of served clients
    pub total_served: u64,

    /// Minutes per client
    pub estimated_wait_time: u32,

    pub created_at: DateTime<Utc>,

    /// Authoritative order: index 0 is next to serve
    #[serde(rename = "clients", default)]
    pub roster: Vec<QueueClient>,

    /// Store-managed revision, bumped on every committed write
    #[serde(default)]
    pub version: u64,
}

impl Queue {
    /// Create a new open queue with an empty roster
    pub fn new(id: QueueId, new: NewQueue, now: DateTime<Utc>) -> Self {
        Self {
            id,
            service_id: new.service_id,
            organization_id: new.organization_id,
            status: QueueStatus::Open,
            current_number: 0,
            total_served: 0,
            estimated_wait_time: new.estimated_wait_time,
            created_at: now,
            roster: Vec::new(),
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Entries still waiting to be called
    pub fn waiting_count(&self) -> usize {
        self.roster.iter().filter(|c| c.is_waiting()).count()
    }

    /// The client currently being served, if any
    pub fn called(&self) -> Option<&QueueClient> {
        self.roster.iter().find(|c| c.is_called())
    }

    /// First active entry belonging to `user_id`
    pub fn entry_for(&self, user_id: &UserId) -> Option<&QueueClient> {
        self.roster.iter().find(|c| &c.user_id == user_id)
    }

    pub fn position_of(&self, user_id: &UserId) -> Option<u32> {
        self.entry_for(user_id).map(|c| c.position)
    }

    /// Rewrite every `position` as index + 1
    pub(crate) fn renumber(&mut self) {
        for (index, client) in self.roster.iter_mut().enumerate() {
            client.position = index as u32 + 1;
        }
    }

    /// Credit `count` clients as served
    pub(crate) fn credit_served(&mut self, count: u64) {
        self.current_number += count;
        self.total_served += count;
    }

    /// Verify the roster invariants that must hold at rest.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut called = 0;
        for (index, client) in self.roster.iter().enumerate() {
            if client.position as usize != index + 1 {
                return Err(InvariantViolation::PositionMismatch {
                    client_id: client.id.clone(),
                    index,
                    position: client.position,
                });
            }
            if client.status.is_terminal() {
                return Err(InvariantViolation::TerminalEntry {
                    client_id: client.id.clone(),
                    status: client.status,
                });
            }
            if client.is_called() {
                called += 1;
                if index != 0 {
                    return Err(InvariantViolation::CalledNotAtFront {
                        client_id: client.id.clone(),
                    });
                }
            }
        }

        if called > 1 {
            return Err(InvariantViolation::MultipleCalled { count: called });
        }

        if self.current_number != self.total_served {
            return Err(InvariantViolation::CounterDrift {
                current_number: self.current_number,
                total_served: self.total_served,
            });
        }

        Ok(())
    }

    /// Equality on domain state, ignoring the store revision
    pub(crate) fn same_state(&self, other: &Queue) -> bool {
        self.id == other.id
            && self.status == other.status
            && self.current_number == other.current_number
            && self.total_served == other.total_served
            && self.estimated_wait_time == other.estimated_wait_time
            && self.roster == other.roster
            && self.service_id == other.service_id
            && self.organization_id == other.organization_id
            && self.created_at == other.created_at
    }
}

#[cfg(feature = "json")]
impl Queue {
    /// Encode as the JSON document shape (camelCase, roster under `clients`)
    pub fn to_json(&self) -> crate::QueueResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> crate::QueueResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

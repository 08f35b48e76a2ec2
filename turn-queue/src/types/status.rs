use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue-level status controlling admission and call-next eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Accepting clients and being served
    Open,

    /// Admission suspended by staff; the roster can still be drained
    Paused,

    /// Terminal display status
    Closed,
}

impl QueueStatus {
    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }

    /// Whether new clients may join
    pub fn accepts_admission(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether staff may advance the roster
    pub fn accepts_calls(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Client lifecycle within a roster.
///
/// `Served` and `Cancelled` are never stored in a committed roster; they
/// only describe why an entry was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Waiting,
    Called,
    Served,
    Cancelled,
}

impl ClientStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Called => "called",
            Self::Served => "served",
            Self::Cancelled => "cancelled",
        }
    }

    /// Waiting or called
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Waiting | Self::Called)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use thiserror::Error;
use turn_core::{ErrorKind, TurnError};

use crate::types::{InvariantViolation, QueueId, QueueStatus, UserId};

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors surfaced by queue operations and document stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue not found: {0}")]
    QueueNotFound(QueueId),

    #[error("Queue already exists: {0}")]
    QueueExists(QueueId),

    #[error("Transaction on queue {queue_id} conflicted {attempts} times")]
    TransactionConflict { queue_id: QueueId, attempts: u32 },

    #[error("Cannot {operation} while queue is {status}")]
    InvalidState {
        status: QueueStatus,
        operation: &'static str,
    },

    #[error("User {user_id} already holds an active entry")]
    AlreadyInQueue { user_id: UserId },

    #[error("Queue is full: {max} clients")]
    QueueFull { max: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Roster invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    /// Transient failures are safe to resubmit unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }

    /// Transport-agnostic classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QueueNotFound(_) => ErrorKind::NotFound,
            Self::QueueExists(_) | Self::AlreadyInQueue { .. } => ErrorKind::Conflict,
            Self::TransactionConflict { .. } => ErrorKind::Unavailable,
            Self::InvalidState { .. } => ErrorKind::Unprocessable,
            Self::QueueFull { .. } => ErrorKind::TooManyRequests,
            Self::InvalidInput(_) => ErrorKind::BadRequest,
            Self::Invariant(_) | Self::SerializationError(_) | Self::Internal(_) => {
                ErrorKind::GeneralError
            }
        }
    }
}

impl From<QueueError> for TurnError {
    fn from(err: QueueError) -> Self {
        TurnError::new(err.kind(), err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_transient_and_unavailable() {
        let err = QueueError::TransactionConflict {
            queue_id: QueueId::from("q1"),
            attempts: 5,
        };
        assert!(err.is_transient());

        let turn: TurnError = err.into();
        assert_eq!(turn.code(), 503);
        assert!(turn.kind.is_retryable());
    }

    #[test]
    fn guard_errors_map_to_client_errors() {
        let closed = QueueError::InvalidState {
            status: QueueStatus::Closed,
            operation: "join",
        };
        assert_eq!(closed.to_string(), "Cannot join while queue is closed");
        assert_eq!(closed.kind(), ErrorKind::Unprocessable);
        assert!(!closed.is_transient());

        assert_eq!(QueueError::QueueFull { max: 50 }.kind().status_code(), 429);
        assert_eq!(QueueError::QueueNotFound(QueueId::from("x")).kind(), ErrorKind::NotFound);
    }
}

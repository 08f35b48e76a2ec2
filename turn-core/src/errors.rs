//! Transport-agnostic errors.
//!
//! Library crates keep their own error enums and classify them into an
//! [`ErrorKind`]; a server adapter only ever sees [`TurnError`]. With the
//! `serde` feature a `TurnError` renders as `{name, message, code, className}`.

use std::fmt;

use anyhow::Error as AnyError;

/// Result type for application-edge code.
pub type TurnResult<T> = std::result::Result<T, AnyError>;

/// Failure classes a queue operation can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Unprocessable,
    TooManyRequests,
    GeneralError,
    Unavailable,
}

impl ErrorKind {
    /// HTTP status code, `name` and kebab-cased `className`
    fn parts(self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotFound => (404, "NotFound", "not-found"),
            ErrorKind::Conflict => (409, "Conflict", "conflict"),
            ErrorKind::Unprocessable => (422, "Unprocessable", "unprocessable"),
            ErrorKind::TooManyRequests => (429, "TooManyRequests", "too-many-requests"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
            ErrorKind::Unavailable => (503, "Unavailable", "unavailable"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.parts().0
    }

    pub fn name(&self) -> &'static str {
        self.parts().1
    }

    pub fn class_name(&self) -> &'static str {
        self.parts().2
    }

    /// Whether a caller may resubmit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Unavailable | ErrorKind::Conflict)
    }
}

/// A classified error that can travel inside `anyhow::Error`.
#[derive(Debug)]
pub struct TurnError {
    pub kind: ErrorKind,
    pub message: String,
    pub source: Option<AnyError>,
}

impl TurnError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Borrow the `TurnError` inside an `anyhow::Error`, if there is one.
    pub fn from_anyhow(err: &AnyError) -> Option<&TurnError> {
        err.downcast_ref::<TurnError>()
    }

    /// Unwrap a `TurnError`, or classify anything else as `GeneralError`
    /// keeping it as the source.
    pub fn normalize(err: AnyError) -> TurnError {
        match err.downcast::<TurnError>() {
            Ok(turn) => turn,
            Err(other) => TurnError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl TurnError {
    /// Client payload; the source chain is never included.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_turn_errors() {
        let err = TurnError::new(ErrorKind::NotFound, "queue q1").into_anyhow();
        let turn = TurnError::normalize(err);
        assert_eq!(turn.kind, ErrorKind::NotFound);
        assert_eq!(turn.code(), 404);
        assert_eq!(turn.to_string(), "NotFound (404): queue q1");
    }

    #[test]
    fn normalize_wraps_foreign_errors() {
        let err = anyhow::anyhow!("disk on fire");
        let turn = TurnError::normalize(err);
        assert_eq!(turn.kind, ErrorKind::GeneralError);
        assert!(std::error::Error::source(&turn).is_some());
    }

    #[test]
    fn anyhow_round_trip_preserves_class() {
        let err = TurnError::new(ErrorKind::TooManyRequests, "roster full").into_anyhow();
        let turn = TurnError::from_anyhow(&err).unwrap();
        assert_eq!(turn.class_name(), "too-many-requests");
        assert_eq!(turn.code(), 429);
    }

    #[test]
    fn retryable_kinds() {
        assert!(ErrorKind::Unavailable.is_retryable());
        assert!(ErrorKind::Conflict.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_payload_has_client_fields_only() {
        let turn = TurnError::normalize(anyhow::anyhow!("secret path /var/db"));
        let json = turn.to_json();
        assert_eq!(json["className"], "general-error");
        assert_eq!(json["code"], 500);
        assert!(json.get("source").is_none());
    }
}

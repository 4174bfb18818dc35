use chrono::{DateTime, Utc};
use thiserror::Error;

/// Domain errors surfaced by the engine.
///
/// I/O-bearing layers return `anyhow::Result`; these variants travel inside it so callers can
/// `downcast_ref::<EngineError>()` to map them onto responses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid domain '{input}'")]
    InvalidDomain { input: String },

    #[error("ping at {timestamp} is before session start {started_at}")]
    OutOfRangeTimestamp {
        timestamp: DateTime<Utc>,
        started_at: DateTime<Utc>,
    },

    #[error("ping at {timestamp} is too far ahead of server time {now}")]
    FutureTimestamp {
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("session {session_id} is being modified by another request")]
    ConcurrentModification { session_id: String },

    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },

    #[error("session {session_id} has already ended")]
    SessionEnded { session_id: String },

    #[error("session {session_id} is still active")]
    SessionActive { session_id: String },
}

/// Helper for tracker callers: is this failure worth retrying?
pub fn is_retryable(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<EngineError>(),
        Some(EngineError::ConcurrentModification { .. })
    )
}

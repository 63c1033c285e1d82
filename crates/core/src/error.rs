//! Error types for the hcplog domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant. None of these are fatal:
//! every one of them is contained at the boundary of a single chat turn.

use std::time::Duration;

use thiserror::Error;

/// The top-level error type for all hcplog operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Record validation ---
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    // --- Transcript ---
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    // --- Assistant collaborator ---
    #[error("Assistant error: {0}")]
    Collaborator(#[from] CollaboratorError),

    // --- Turn guard ---
    #[error("A request is already in flight for conversation {conversation_id}")]
    TurnInProgress { conversation_id: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// An extraction referenced something the record cannot hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Unknown interaction field: {0}")]
    InvalidField(String),

    #[error("Invalid value '{value}' for {field} (expected one of: {allowed})")]
    InvalidEnumValue {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("Cannot send an empty message")]
    EmptyMessage,
}

/// A single failure signal from the assistant collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("Assistant request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed assistant response: {0}")]
    Parse(String),

    #[error("Assistant did not answer within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Assistant not configured: {0}")]
    NotConfigured(String),

    #[error("Assistant task aborted: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_error_lists_allowed_values() {
        let err = Error::Record(RecordError::InvalidEnumValue {
            field: "sentiment".into(),
            value: "Ecstatic".into(),
            allowed: "Positive, Neutral, Negative".into(),
        });
        assert!(err.to_string().contains("Ecstatic"));
        assert!(err.to_string().contains("Neutral"));
    }

    #[test]
    fn collaborator_error_displays_status() {
        let err = Error::Collaborator(CollaboratorError::Api {
            status_code: 502,
            message: "Bad gateway".into(),
        });
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("Bad gateway"));
    }

    #[test]
    fn sub_second_timeout_is_reported_exactly() {
        let err = CollaboratorError::Timeout {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "Assistant did not answer within 250ms");
    }
}

//! Error types for the faultline-events crate.

use thiserror::Error;

/// Errors that can occur while storing or querying error events.
#[derive(Debug, Error)]
pub enum EventError {
    /// No event exists with the given ID.
    #[error("event not found: {id}")]
    EventNotFound {
        /// The event ID that was not found.
        id: u64,
    },

    /// No group exists with the given ID.
    #[error("group not found: {id}")]
    GroupNotFound {
        /// The group ID that was not found.
        id: u64,
    },

    /// A group with this fingerprint already exists.
    ///
    /// Raised by the storage boundary when two inserts race for the same
    /// fresh fingerprint. Callers re-read the existing group.
    #[error("duplicate fingerprint: {fingerprint}")]
    DuplicateFingerprint {
        /// The fingerprint that is already taken.
        fingerprint: String,
    },

    /// The incoming event is malformed.
    #[error("invalid event: {reason}")]
    InvalidEvent {
        /// The reason the event was rejected.
        reason: String,
    },

    /// A statistics query had out-of-range parameters.
    #[error("invalid query: {reason}")]
    InvalidQuery {
        /// The reason the query was rejected.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;

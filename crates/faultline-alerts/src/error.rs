//! Error types for the faultline-alerts crate.

use faultline_events::EventError;
use thiserror::Error;

/// Errors that can occur in the alerting engine.
#[derive(Debug, Error)]
pub enum AlertError {
    /// Invalid alert rule configuration.
    #[error("invalid alert rule: {reason}")]
    InvalidRule {
        /// The reason the rule is invalid.
        reason: String,
    },

    /// Alert rule with the given ID was not found.
    #[error("rule not found: {id}")]
    RuleNotFound {
        /// The rule ID that was not found.
        id: String,
    },

    /// A rule's parameter map does not fit its condition kind.
    #[error("invalid parameters for {condition}: {reason}")]
    InvalidConditionParams {
        /// The condition kind being parsed.
        condition: String,
        /// What was wrong with the parameters.
        reason: String,
    },

    /// Failed to evaluate a rule's condition.
    #[error("condition evaluation failed: {reason}")]
    EvaluationError {
        /// The reason the evaluation failed.
        reason: String,
    },

    /// Notification delivery failed.
    #[error("notification failed: {reason}")]
    NotificationFailed {
        /// The reason the notification failed.
        reason: String,
    },

    /// The event store rejected a query.
    #[error("event store error: {0}")]
    Store(#[from] EventError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;

//! Error types for the faultline service.

use faultline_alerts::AlertError;
use faultline_events::EventError;
use thiserror::Error;

/// Errors that can occur in the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An input record could not be read.
    #[error("invalid input on line {line}: {reason}")]
    InvalidInput {
        /// One-based line number.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Event store error.
    #[error("event error: {0}")]
    Events(#[from] EventError),

    /// Alerting error.
    #[error("alert error: {0}")]
    Alerts(#[from] AlertError),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ServiceError::Config("alerts.channel_timeout_secs must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: alerts.channel_timeout_secs must be greater than 0"
        );
    }

    #[test]
    fn test_invalid_input_display() {
        let err = ServiceError::InvalidInput {
            line: 3,
            reason: "missing field `message`".to_string(),
        };
        assert_eq!(err.to_string(), "invalid input on line 3: missing field `message`");
    }

    #[test]
    fn test_events_error_from() {
        let err: ServiceError = EventError::GroupNotFound { id: 7 }.into();
        assert!(matches!(err, ServiceError::Events(_)));
        assert!(err.to_string().starts_with("event error: "));
    }

    #[test]
    fn test_io_error_from() {
        let err: ServiceError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.to_string(), "io error: gone");
    }
}

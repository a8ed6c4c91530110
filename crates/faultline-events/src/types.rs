//! Core types for error events.
//!
//! This module provides:
//! - [`ErrorType`], [`Severity`], [`ErrorStatus`]: categorical event fields
//! - [`ErrorEvent`]: a stored, immutable error occurrence
//! - [`NewErrorEvent`]: the ingestion payload before an ID is assigned
//! - [`EventUpdate`]: the operator-facing mutable fields
//! - [`EventFilter`] / [`TimeRange`]: the historical query surface

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EventError, Result};

/// Unique identifier for a stored error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an error group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The category an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// HTTP-level failure (bad status, protocol error).
    Http,
    /// Database failure.
    Database,
    /// Authentication or authorization failure.
    Auth,
    /// Input validation failure.
    Validation,
    /// Latency or resource exhaustion.
    Performance,
    /// Failure talking to a third-party integration.
    Integration,
    /// Generic application error.
    Application,
    /// Error reported by a browser client.
    Frontend,
}

impl ErrorType {
    /// All error types, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Http,
        Self::Database,
        Self::Auth,
        Self::Validation,
        Self::Performance,
        Self::Integration,
        Self::Application,
        Self::Frontend,
    ];

    /// Returns the wire name of this error type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "HTTP",
            Self::Database => "DATABASE",
            Self::Auth => "AUTH",
            Self::Validation => "VALIDATION",
            Self::Performance => "PERFORMANCE",
            Self::Integration => "INTEGRATION",
            Self::Application => "APPLICATION",
            Self::Frontend => "FRONTEND",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EventError::InvalidEvent {
                reason: format!("unknown error type: {s}"),
            })
    }
}

/// How severe an error is.
///
/// Totally ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Cosmetic or easily recoverable.
    Low,
    /// Degraded behaviour.
    #[default]
    Medium,
    /// A feature is broken.
    High,
    /// Requires immediate attention.
    Critical,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Returns the wire name of this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of an error event or group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorStatus {
    /// Newly reported, nobody is looking at it.
    #[default]
    Open,
    /// Someone is working on it.
    InProgress,
    /// Fixed.
    Resolved,
    /// Deliberately ignored.
    Ignored,
}

impl ErrorStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Ignored];

    /// Returns the wire name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored error occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Free-text error message.
    pub message: String,
    /// Error category.
    pub error_type: ErrorType,
    /// Error severity.
    pub severity: Severity,
    /// Where the error came from (frontend, backend, a service name, ...).
    pub source: String,
    /// Full stack trace, if reported.
    pub stack_trace: Option<String>,
    /// Request path the error occurred on.
    pub endpoint: Option<String>,
    /// HTTP method of the failing request.
    pub method: Option<String>,
    /// HTTP status code of the failing request.
    pub status_code: Option<u16>,
    /// Affected user.
    pub user_id: Option<String>,
    /// Affected session.
    pub session_id: Option<String>,
    /// Client network address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// Arbitrary reporter-supplied metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Workflow status.
    pub status: ErrorStatus,
    /// Who is working on it.
    pub assigned_to: Option<String>,
    /// Operator notes.
    pub notes: Option<String>,
    /// Group this event was merged into.
    pub group_id: Option<GroupId>,
    /// When the error occurred.
    pub timestamp: DateTime<Utc>,
    /// When the error was marked resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ErrorEvent {
    /// Checks if this event matches the given filter.
    #[must_use]
    pub fn matches(&self, filter: &EventFilter) -> bool {
        if filter.error_type.is_some_and(|t| t != self.error_type) {
            return false;
        }
        if filter.severity.is_some_and(|s| s != self.severity) {
            return false;
        }
        if let Some(ref source) = filter.source {
            if *source != self.source {
                return false;
            }
        }
        filter.time_range.contains(self.timestamp)
    }

    /// Applies a status transition, stamping `resolved_at` on resolution.
    pub fn set_status(&mut self, status: ErrorStatus, now: DateTime<Utc>) {
        if status == ErrorStatus::Resolved && self.status != ErrorStatus::Resolved {
            self.resolved_at = Some(now);
        }
        self.status = status;
    }
}

/// An error event as reported, before the store assigns an ID and group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewErrorEvent {
    /// Free-text error message.
    pub message: String,
    /// Error category.
    pub error_type: ErrorType,
    /// Error severity.
    pub severity: Severity,
    /// Where the error came from.
    pub source: String,
    /// Full stack trace.
    #[serde(default)]
    pub stack_trace: Option<String>,
    /// Request path.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP method.
    #[serde(default)]
    pub method: Option<String>,
    /// HTTP status code.
    #[serde(default)]
    pub status_code: Option<u16>,
    /// Affected user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Affected session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Client network address.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Arbitrary metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Occurrence time; the store uses its clock when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewErrorEvent {
    /// Maximum allowed length of the `source` label.
    pub const MAX_SOURCE_LENGTH: usize = 100;

    /// Creates a new event payload with the required fields.
    pub fn new(
        message: impl Into<String>,
        error_type: ErrorType,
        severity: Severity,
        source: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            error_type,
            severity,
            source: source.into(),
            stack_trace: None,
            endpoint: None,
            method: None,
            status_code: None,
            user_id: None,
            session_id: None,
            ip_address: None,
            user_agent: None,
            metadata: HashMap::new(),
            timestamp: None,
        }
    }

    /// Sets the stack trace.
    #[must_use]
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Sets the endpoint and HTTP method.
    #[must_use]
    pub fn with_endpoint(mut self, method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the HTTP status code.
    #[must_use]
    pub const fn with_status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the user and session context.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>, session_id: Option<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.session_id = session_id;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Sets an explicit occurrence time.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validates the payload.
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidEvent` if the message or source is empty,
    /// or the source label is too long.
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(EventError::InvalidEvent {
                reason: "message cannot be empty".to_string(),
            });
        }
        if self.source.trim().is_empty() {
            return Err(EventError::InvalidEvent {
                reason: "source cannot be empty".to_string(),
            });
        }
        if self.source.len() > Self::MAX_SOURCE_LENGTH {
            return Err(EventError::InvalidEvent {
                reason: format!(
                    "source exceeds maximum length of {} characters",
                    Self::MAX_SOURCE_LENGTH
                ),
            });
        }
        Ok(())
    }

    /// Converts the payload into a stored event.
    #[must_use]
    pub fn into_event(self, id: EventId, group_id: Option<GroupId>, now: DateTime<Utc>) -> ErrorEvent {
        ErrorEvent {
            id,
            message: self.message,
            error_type: self.error_type,
            severity: self.severity,
            source: self.source,
            stack_trace: self.stack_trace,
            endpoint: self.endpoint,
            method: self.method,
            status_code: self.status_code,
            user_id: self.user_id,
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            metadata: self.metadata,
            status: ErrorStatus::Open,
            assigned_to: None,
            notes: None,
            group_id,
            timestamp: self.timestamp.unwrap_or(now),
            resolved_at: None,
        }
    }
}

/// Operator-facing update of an event. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New workflow status.
    #[serde(default)]
    pub status: Option<ErrorStatus>,
    /// New assignee.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// New notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Time range for filtering events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: Option<DateTime<Utc>>,
    /// End of the range (exclusive).
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Creates a time range with the given bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Creates an open-ended range starting at `start`.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Creates the half-open range `[start, end)`.
    #[must_use]
    pub const fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Checks if a timestamp falls within this range.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if self.start.is_some_and(|start| timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| timestamp >= end) {
            return false;
        }
        true
    }
}

/// Filter for counting historical events.
///
/// Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Required error type.
    pub error_type: Option<ErrorType>,
    /// Required severity.
    pub severity: Option<Severity>,
    /// Required source label.
    pub source: Option<String>,
    /// Time range the event timestamp must fall in.
    #[serde(default)]
    pub time_range: TimeRange,
}

impl EventFilter {
    /// Creates an empty filter that matches every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to an error type.
    #[must_use]
    pub const fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    /// Restricts to a severity.
    #[must_use]
    pub const fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Restricts to a source label.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Restricts to a time range.
    #[must_use]
    pub const fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_event(now: DateTime<Utc>) -> ErrorEvent {
        NewErrorEvent::new("boom", ErrorType::Database, Severity::High, "backend")
            .into_event(EventId(1), None, now)
    }

    mod enum_tests {
        use super::*;

        #[test]
        fn severity_is_totally_ordered() {
            assert!(Severity::Low < Severity::Medium);
            assert!(Severity::Medium < Severity::High);
            assert!(Severity::High < Severity::Critical);
            assert_eq!(Severity::Low.max(Severity::Critical), Severity::Critical);
        }

        #[test]
        fn wire_names() {
            assert_eq!(
                serde_json::to_string(&ErrorStatus::InProgress).unwrap(),
                "\"IN_PROGRESS\""
            );
            assert_eq!(serde_json::to_string(&ErrorType::Http).unwrap(), "\"HTTP\"");
            assert_eq!(
                serde_json::from_str::<Severity>("\"CRITICAL\"").unwrap(),
                Severity::Critical
            );
        }

        #[test]
        fn error_type_from_str() {
            assert_eq!("database".parse::<ErrorType>().unwrap(), ErrorType::Database);
            assert_eq!("FRONTEND".parse::<ErrorType>().unwrap(), ErrorType::Frontend);
            assert!("nope".parse::<ErrorType>().is_err());
        }

        #[test]
        fn display_matches_as_str() {
            for t in ErrorType::ALL {
                assert_eq!(t.to_string(), t.as_str());
            }
            for s in ErrorStatus::ALL {
                assert_eq!(s.to_string(), s.as_str());
            }
        }
    }

    mod new_event_tests {
        use super::*;

        #[test]
        fn validate_rejects_empty_message() {
            let event = NewErrorEvent::new("  ", ErrorType::Http, Severity::Low, "api");
            assert!(matches!(
                event.validate(),
                Err(EventError::InvalidEvent { .. })
            ));
        }

        #[test]
        fn validate_rejects_long_source() {
            let source = "s".repeat(NewErrorEvent::MAX_SOURCE_LENGTH + 1);
            let event = NewErrorEvent::new("x", ErrorType::Http, Severity::Low, source);
            assert!(event.validate().is_err());
        }

        #[test]
        fn into_event_defaults() {
            let now = Utc::now();
            let event = sample_event(now);
            assert_eq!(event.status, ErrorStatus::Open);
            assert_eq!(event.timestamp, now);
            assert!(event.resolved_at.is_none());
        }

        #[test]
        fn into_event_keeps_explicit_timestamp() {
            let now = Utc::now();
            let earlier = now - Duration::hours(3);
            let event = NewErrorEvent::new("x", ErrorType::Auth, Severity::Low, "api")
                .at(earlier)
                .into_event(EventId(9), Some(GroupId(2)), now);
            assert_eq!(event.timestamp, earlier);
            assert_eq!(event.group_id, Some(GroupId(2)));
        }

        #[test]
        fn deserialize_minimal_payload() {
            let json = r#"{"message":"m","error_type":"AUTH","severity":"LOW","source":"api"}"#;
            let event: NewErrorEvent = serde_json::from_str(json).unwrap();
            assert_eq!(event.error_type, ErrorType::Auth);
            assert!(event.endpoint.is_none());
            assert!(event.metadata.is_empty());
        }
    }

    mod status_tests {
        use super::*;

        #[test]
        fn resolving_stamps_resolved_at() {
            let now = Utc::now();
            let mut event = sample_event(now);
            event.set_status(ErrorStatus::Resolved, now);
            assert_eq!(event.resolved_at, Some(now));
        }

        #[test]
        fn resolving_twice_keeps_first_timestamp() {
            let now = Utc::now();
            let mut event = sample_event(now);
            event.set_status(ErrorStatus::Resolved, now);
            event.set_status(ErrorStatus::Resolved, now + Duration::minutes(5));
            assert_eq!(event.resolved_at, Some(now));
        }

        #[test]
        fn other_status_leaves_resolved_at() {
            let now = Utc::now();
            let mut event = sample_event(now);
            event.set_status(ErrorStatus::InProgress, now);
            assert!(event.resolved_at.is_none());
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn empty_filter_matches_all() {
            let event = sample_event(Utc::now());
            assert!(event.matches(&EventFilter::new()));
        }

        #[test]
        fn filter_fields_must_all_match() {
            let event = sample_event(Utc::now());
            assert!(event.matches(
                &EventFilter::new()
                    .with_error_type(ErrorType::Database)
                    .with_severity(Severity::High)
                    .with_source("backend")
            ));
            assert!(!event.matches(&EventFilter::new().with_source("frontend")));
            assert!(!event.matches(&EventFilter::new().with_severity(Severity::Low)));
            assert!(!event.matches(&EventFilter::new().with_error_type(ErrorType::Http)));
        }

        #[test]
        fn time_range_is_half_open() {
            let now = Utc::now();
            let range = TimeRange::between(now - Duration::minutes(5), now);
            assert!(range.contains(now - Duration::minutes(5)));
            assert!(range.contains(now - Duration::seconds(1)));
            assert!(!range.contains(now));
            assert!(!range.contains(now - Duration::minutes(6)));
        }

        #[test]
        fn since_is_open_ended() {
            let now = Utc::now();
            let range = TimeRange::since(now);
            assert!(range.contains(now + Duration::days(1)));
            assert!(!range.contains(now - Duration::seconds(1)));
        }
    }
}

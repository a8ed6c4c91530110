//! Storage traits for events and groups.
//!
//! These traits are the boundary between the grouping/alerting logic and the
//! persistence layer. [`crate::MemoryEventStore`] is the in-process
//! implementation; a database-backed store implements the same traits.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::group::{ErrorGroup, GroupCandidate};
use crate::types::{
    ErrorEvent, ErrorStatus, ErrorType, EventFilter, EventId, EventUpdate, GroupId,
    NewErrorEvent, Severity, TimeRange,
};

/// Group persistence with at-most-one group per fingerprint.
pub trait GroupStore: Send + Sync {
    /// Looks up the group owning a fingerprint.
    fn find_group(&self, fingerprint: &str) -> Option<ErrorGroup>;

    /// Looks up a group by ID.
    fn get_group(&self, id: GroupId) -> Option<ErrorGroup>;

    /// Inserts a new group.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DuplicateFingerprint` if a group with the same
    /// fingerprint already exists. Implementations must make the check and
    /// the insert atomic.
    fn insert_group(&self, candidate: GroupCandidate, now: DateTime<Utc>) -> Result<ErrorGroup>;

    /// Records one more occurrence against an existing group.
    ///
    /// # Errors
    ///
    /// Returns `EventError::GroupNotFound` if the group does not exist.
    fn record_occurrence(
        &self,
        id: GroupId,
        severity: Severity,
        seen_at: DateTime<Utc>,
    ) -> Result<ErrorGroup>;
}

/// Read-only historical query surface used by alert conditions.
pub trait EventQuery: Send + Sync {
    /// Counts events matching the filter, including its time range.
    fn count_events(&self, filter: &EventFilter) -> Result<u64>;

    /// Counts events with this exact type and message inside the range.
    fn count_similar(&self, error_type: ErrorType, message: &str, range: &TimeRange) -> Result<u64>;
}

/// Full event store: append, lookup, operator updates, plus the group and
/// query surfaces.
pub trait EventStore: GroupStore + EventQuery {
    /// Persists a new event, assigning it an ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot accept the event.
    fn append(&self, event: NewErrorEvent, group_id: Option<GroupId>) -> Result<ErrorEvent>;

    /// Gets an event by ID.
    fn get_event(&self, id: EventId) -> Option<ErrorEvent>;

    /// Applies an operator update to an event.
    ///
    /// # Errors
    ///
    /// Returns `EventError::EventNotFound` if the event does not exist.
    fn update_event(&self, id: EventId, update: EventUpdate) -> Result<ErrorEvent>;

    /// Sets a group's status and cascades it to every member event.
    ///
    /// Returns the number of member events updated.
    ///
    /// # Errors
    ///
    /// Returns `EventError::GroupNotFound` if the group does not exist.
    fn update_group_status(&self, id: GroupId, status: ErrorStatus) -> Result<usize>;

    /// Returns the number of stored events.
    fn len(&self) -> usize;

    /// Returns true if no events are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

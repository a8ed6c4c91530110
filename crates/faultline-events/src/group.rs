//! Error groups and the fingerprint upsert protocol.
//!
//! Every distinct fingerprint owns exactly one [`ErrorGroup`]. The first
//! occurrence creates it; later occurrences bump its counters and escalate its
//! severity. [`upsert_group`] implements this on top of any [`GroupStore`],
//! relying on the store to reject a second insert for a fingerprint with
//! [`EventError::DuplicateFingerprint`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EventError, Result};
use crate::traits::GroupStore;
use crate::types::{ErrorStatus, ErrorType, GroupId, Severity};

/// Aggregate of all events sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorGroup {
    /// Store-assigned identifier.
    pub id: GroupId,
    /// Content-derived identity, unique across groups.
    pub fingerprint: String,
    /// Error type of the group.
    pub error_type: ErrorType,
    /// Highest severity seen across member events.
    pub severity: Severity,
    /// Source of the first occurrence.
    pub source: String,
    /// Representative normalized message.
    pub message_pattern: String,
    /// Number of member events.
    pub total_occurrences: u64,
    /// When the first member was recorded.
    pub first_seen: DateTime<Utc>,
    /// When the latest member was recorded.
    pub last_seen: DateTime<Utc>,
    /// Workflow status of the group.
    pub status: ErrorStatus,
}

impl ErrorGroup {
    /// Folds one more occurrence into the group.
    ///
    /// Severity only ever escalates; the pattern, first-seen time, source and
    /// type are left alone.
    pub fn record_occurrence(&mut self, severity: Severity, seen_at: DateTime<Utc>) {
        self.total_occurrences += 1;
        self.last_seen = seen_at;
        self.severity = self.severity.max(severity);
    }
}

/// Everything needed to create a group for a fresh fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCandidate {
    /// Fingerprint of the occurrence.
    pub fingerprint: String,
    /// Error type of the occurrence.
    pub error_type: ErrorType,
    /// Severity of the occurrence.
    pub severity: Severity,
    /// Source of the occurrence.
    pub source: String,
    /// Normalized message of the occurrence.
    pub message_pattern: String,
}

impl GroupCandidate {
    /// Builds the initial group record for this candidate.
    #[must_use]
    pub fn into_group(self, id: GroupId, now: DateTime<Utc>) -> ErrorGroup {
        ErrorGroup {
            id,
            fingerprint: self.fingerprint,
            error_type: self.error_type,
            severity: self.severity,
            source: self.source,
            message_pattern: self.message_pattern,
            total_occurrences: 1,
            first_seen: now,
            last_seen: now,
            status: ErrorStatus::Open,
        }
    }
}

/// Maps an occurrence onto its group, creating the group if needed.
///
/// If the store reports a uniqueness violation on insert, another writer won
/// the race for this fingerprint; the existing group is re-read and the
/// occurrence is recorded against it instead.
///
/// # Errors
///
/// Propagates store errors other than the handled uniqueness violation.
pub fn upsert_group<S>(store: &S, candidate: GroupCandidate, now: DateTime<Utc>) -> Result<ErrorGroup>
where
    S: GroupStore + ?Sized,
{
    if let Some(existing) = store.find_group(&candidate.fingerprint) {
        return store.record_occurrence(existing.id, candidate.severity, now);
    }

    let fingerprint = candidate.fingerprint.clone();
    let severity = candidate.severity;

    match store.insert_group(candidate, now) {
        Ok(group) => {
            info!(
                group_id = %group.id,
                fingerprint = %group.fingerprint,
                error_type = %group.error_type,
                "created error group"
            );
            Ok(group)
        }
        Err(EventError::DuplicateFingerprint { .. }) => {
            debug!(fingerprint = %fingerprint, "lost group insert race, re-reading");
            let existing = store
                .find_group(&fingerprint)
                .ok_or_else(|| EventError::DuplicateFingerprint {
                    fingerprint: fingerprint.clone(),
                })?;
            store.record_occurrence(existing.id, severity, now)
        }
        Err(e) => Err(e),
    }
}

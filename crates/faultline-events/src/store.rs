//! In-memory event and group storage.
//!
//! [`MemoryEventStore`] keeps events in insertion order with a bounded
//! capacity and keeps groups in a fingerprint-indexed table. The group table
//! sits behind one lock, so the uniqueness check and the insert in
//! [`GroupStore::insert_group`] are a single atomic step.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{EventError, Result};
use crate::group::{ErrorGroup, GroupCandidate};
use crate::stats::{self, StatsSummary, TopError};
use crate::traits::{EventQuery, EventStore, GroupStore};
use crate::types::{
    ErrorEvent, ErrorStatus, ErrorType, EventFilter, EventId, EventUpdate, GroupId,
    NewErrorEvent, Severity, TimeRange,
};

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct EventStoreConfig {
    /// Maximum number of events to keep; the oldest are dropped first.
    pub max_events: usize,
}

impl Default for EventStoreConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
        }
    }
}

#[derive(Debug, Default)]
struct GroupTable {
    groups: HashMap<GroupId, ErrorGroup>,
    by_fingerprint: HashMap<String, GroupId>,
}

/// Thread-safe in-memory event store.
#[derive(Debug)]
pub struct MemoryEventStore {
    config: EventStoreConfig,
    // Lock order: `groups` before `events`.
    groups: RwLock<GroupTable>,
    events: RwLock<VecDeque<ErrorEvent>>,
    next_event_id: AtomicU64,
    next_group_id: AtomicU64,
}

impl MemoryEventStore {
    /// Creates a store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EventStoreConfig::default())
    }

    /// Creates a store with the given configuration.
    #[must_use]
    pub fn with_config(config: EventStoreConfig) -> Self {
        Self {
            config,
            groups: RwLock::new(GroupTable::default()),
            events: RwLock::new(VecDeque::new()),
            next_event_id: AtomicU64::new(1),
            next_group_id: AtomicU64::new(1),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EventStoreConfig {
        &self.config
    }

    /// Returns all groups, most recently seen first.
    #[must_use]
    pub fn list_groups(&self) -> Vec<ErrorGroup> {
        let mut groups: Vec<_> = self.groups.read().groups.values().cloned().collect();
        groups.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.id.cmp(&b.id)));
        groups
    }

    /// Returns the events belonging to a group, oldest first.
    #[must_use]
    pub fn events_in_group(&self, id: GroupId) -> Vec<ErrorEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.group_id == Some(id))
            .cloned()
            .collect()
    }

    /// Summarises the last `period_days` days of events.
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidQuery` if `period_days` is outside `1..=365`.
    pub fn summary(&self, period_days: u32) -> Result<StatsSummary> {
        stats::summarize(self.events.read().iter(), period_days, Utc::now())
    }

    /// Returns the most frequent `(message, type)` pairs of the last
    /// `period_days` days.
    ///
    /// # Errors
    ///
    /// Returns `EventError::InvalidQuery` if `period_days` is outside `1..=365`.
    pub fn top_errors(&self, limit: usize, period_days: u32) -> Result<Vec<TopError>> {
        stats::top_errors(self.events.read().iter(), limit, period_days, Utc::now())
    }

    fn position(events: &VecDeque<ErrorEvent>, id: EventId) -> Option<usize> {
        // IDs are assigned monotonically and eviction only pops the front.
        events.binary_search_by_key(&id, |e| e.id).ok()
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStore for MemoryEventStore {
    fn find_group(&self, fingerprint: &str) -> Option<ErrorGroup> {
        let table = self.groups.read();
        table
            .by_fingerprint
            .get(fingerprint)
            .and_then(|id| table.groups.get(id))
            .cloned()
    }

    fn get_group(&self, id: GroupId) -> Option<ErrorGroup> {
        self.groups.read().groups.get(&id).cloned()
    }

    fn insert_group(&self, candidate: GroupCandidate, now: DateTime<Utc>) -> Result<ErrorGroup> {
        let mut table = self.groups.write();

        if table.by_fingerprint.contains_key(&candidate.fingerprint) {
            return Err(EventError::DuplicateFingerprint {
                fingerprint: candidate.fingerprint,
            });
        }

        let id = GroupId(self.next_group_id.fetch_add(1, Ordering::Relaxed));
        let group = candidate.into_group(id, now);
        table.by_fingerprint.insert(group.fingerprint.clone(), id);
        table.groups.insert(id, group.clone());

        Ok(group)
    }

    fn record_occurrence(
        &self,
        id: GroupId,
        severity: Severity,
        seen_at: DateTime<Utc>,
    ) -> Result<ErrorGroup> {
        let mut table = self.groups.write();
        let group = table
            .groups
            .get_mut(&id)
            .ok_or(EventError::GroupNotFound { id: id.0 })?;
        group.record_occurrence(severity, seen_at);
        Ok(group.clone())
    }
}

impl EventQuery for MemoryEventStore {
    fn count_events(&self, filter: &EventFilter) -> Result<u64> {
        let events = self.events.read();
        Ok(events.iter().filter(|e| e.matches(filter)).count() as u64)
    }

    fn count_similar(&self, error_type: ErrorType, message: &str, range: &TimeRange) -> Result<u64> {
        let events = self.events.read();
        Ok(events
            .iter()
            .filter(|e| e.error_type == error_type && e.message == message && range.contains(e.timestamp))
            .count() as u64)
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, event: NewErrorEvent, group_id: Option<GroupId>) -> Result<ErrorEvent> {
        event.validate()?;

        // The ID is taken under the write lock so the deque stays sorted by ID.
        let mut events = self.events.write();
        let id = EventId(self.next_event_id.fetch_add(1, Ordering::Relaxed));
        let event = event.into_event(id, group_id, Utc::now());
        events.push_back(event.clone());
        while events.len() > self.config.max_events {
            if let Some(evicted) = events.pop_front() {
                debug!(event_id = %evicted.id, "evicted event over capacity");
            }
        }

        Ok(event)
    }

    fn get_event(&self, id: EventId) -> Option<ErrorEvent> {
        let events = self.events.read();
        Self::position(&events, id).map(|i| events[i].clone())
    }

    fn update_event(&self, id: EventId, update: EventUpdate) -> Result<ErrorEvent> {
        let mut events = self.events.write();
        let index = Self::position(&events, id).ok_or(EventError::EventNotFound { id: id.0 })?;
        let event = &mut events[index];

        if let Some(status) = update.status {
            event.set_status(status, Utc::now());
        }
        if let Some(assigned_to) = update.assigned_to {
            event.assigned_to = Some(assigned_to);
        }
        if let Some(notes) = update.notes {
            event.notes = Some(notes);
        }

        Ok(event.clone())
    }

    fn update_group_status(&self, id: GroupId, status: ErrorStatus) -> Result<usize> {
        let mut table = self.groups.write();
        let group = table
            .groups
            .get_mut(&id)
            .ok_or(EventError::GroupNotFound { id: id.0 })?;
        group.status = status;

        let now = Utc::now();
        let mut events = self.events.write();
        let mut updated = 0;
        for event in events.iter_mut().filter(|e| e.group_id == Some(id)) {
            event.set_status(status, now);
            updated += 1;
        }

        debug!(group_id = %id, status = %status, events = updated, "cascaded group status");
        Ok(updated)
    }

    fn len(&self) -> usize {
        self.events.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::upsert_group;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_event(message: &str) -> NewErrorEvent {
        NewErrorEvent::new(message, ErrorType::Database, Severity::Medium, "backend")
    }

    fn candidate(fingerprint: &str) -> GroupCandidate {
        GroupCandidate {
            fingerprint: fingerprint.to_string(),
            error_type: ErrorType::Database,
            severity: Severity::Low,
            source: "backend".to_string(),
            message_pattern: "p".to_string(),
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn append_assigns_increasing_ids() {
            let store = MemoryEventStore::new();
            let a = store.append(new_event("a"), None).unwrap();
            let b = store.append(new_event("b"), None).unwrap();
            assert!(a.id < b.id);
            assert_eq!(store.len(), 2);
            assert_eq!(store.get_event(b.id).unwrap().message, "b");
        }

        #[test]
        fn append_rejects_invalid_event() {
            let store = MemoryEventStore::new();
            assert!(store.append(new_event(""), None).is_err());
            assert!(store.is_empty());
        }

        #[test]
        fn capacity_evicts_oldest() {
            let store = MemoryEventStore::with_config(EventStoreConfig { max_events: 2 });
            let first = store.append(new_event("a"), None).unwrap();
            store.append(new_event("b"), None).unwrap();
            store.append(new_event("c"), None).unwrap();
            assert_eq!(store.len(), 2);
            assert!(store.get_event(first.id).is_none());
        }

        #[test]
        fn update_event_sets_resolved_at() {
            let store = MemoryEventStore::new();
            let event = store.append(new_event("a"), None).unwrap();

            let updated = store
                .update_event(
                    event.id,
                    EventUpdate {
                        status: Some(ErrorStatus::Resolved),
                        assigned_to: Some("dana".to_string()),
                        notes: None,
                    },
                )
                .unwrap();

            assert_eq!(updated.status, ErrorStatus::Resolved);
            assert!(updated.resolved_at.is_some());
            assert_eq!(updated.assigned_to.as_deref(), Some("dana"));
        }

        #[test]
        fn update_missing_event_fails() {
            let store = MemoryEventStore::new();
            let result = store.update_event(EventId(99), EventUpdate::default());
            assert!(matches!(result, Err(EventError::EventNotFound { id: 99 })));
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn count_events_applies_filter_and_range() {
            let store = MemoryEventStore::new();
            let now = Utc::now();
            store.append(new_event("a").at(now - Duration::minutes(2)), None).unwrap();
            store.append(new_event("b").at(now - Duration::minutes(20)), None).unwrap();
            store
                .append(
                    NewErrorEvent::new("c", ErrorType::Http, Severity::Low, "api")
                        .at(now - Duration::minutes(1)),
                    None,
                )
                .unwrap();

            let recent_db = EventFilter::new()
                .with_error_type(ErrorType::Database)
                .with_time_range(TimeRange::since(now - Duration::minutes(5)));
            assert_eq!(store.count_events(&recent_db).unwrap(), 1);
            assert_eq!(store.count_events(&EventFilter::new()).unwrap(), 3);
        }

        #[test]
        fn count_similar_requires_exact_message() {
            let store = MemoryEventStore::new();
            let now = Utc::now();
            store.append(new_event("disk full").at(now - Duration::hours(2)), None).unwrap();
            store.append(new_event("disk full!").at(now - Duration::hours(2)), None).unwrap();

            let range = TimeRange::between(now - Duration::hours(24), now);
            assert_eq!(store.count_similar(ErrorType::Database, "disk full", &range).unwrap(), 1);
            assert_eq!(store.count_similar(ErrorType::Http, "disk full", &range).unwrap(), 0);
        }
    }

    mod group_tests {
        use super::*;

        #[test]
        fn insert_rejects_duplicate_fingerprint() {
            let store = MemoryEventStore::new();
            let now = Utc::now();
            store.insert_group(candidate("fp"), now).unwrap();

            let result = store.insert_group(candidate("fp"), now);
            assert!(matches!(result, Err(EventError::DuplicateFingerprint { .. })));
        }

        #[test]
        fn grouping_is_idempotent() {
            let store = MemoryEventStore::new();
            let now = Utc::now();
            for _ in 0..25 {
                upsert_group(&store, candidate("fp"), now).unwrap();
            }
            let groups = store.list_groups();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].total_occurrences, 25);
        }

        #[test]
        fn concurrent_upserts_create_one_group() {
            let store = Arc::new(MemoryEventStore::new());
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        for _ in 0..50 {
                            upsert_group(store.as_ref(), candidate("race"), Utc::now()).unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let groups = store.list_groups();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].total_occurrences, 400);
        }

        #[test]
        fn concurrent_appends_stay_addressable() {
            let store = Arc::new(MemoryEventStore::new());
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        (0..200)
                            .map(|i| store.append(new_event(&format!("t{t} e{i}")), None).unwrap().id)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let ids: Vec<EventId> = handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect();

            assert_eq!(ids.len(), 1600);
            for id in ids {
                let event = store.get_event(id);
                assert!(event.is_some(), "event {id} not found");
            }
            let update = EventUpdate {
                status: Some(ErrorStatus::InProgress),
                ..EventUpdate::default()
            };
            assert!(store.update_event(EventId(1), update).is_ok());
        }

        #[test]
        fn group_status_cascades_to_members() {
            let store = MemoryEventStore::new();
            let group = store.insert_group(candidate("fp"), Utc::now()).unwrap();
            store.append(new_event("a"), Some(group.id)).unwrap();
            store.append(new_event("b"), Some(group.id)).unwrap();
            let outsider = store.append(new_event("c"), None).unwrap();

            let updated = store.update_group_status(group.id, ErrorStatus::Resolved).unwrap();

            assert_eq!(updated, 2);
            assert_eq!(store.get_group(group.id).unwrap().status, ErrorStatus::Resolved);
            for event in store.events_in_group(group.id) {
                assert_eq!(event.status, ErrorStatus::Resolved);
                assert!(event.resolved_at.is_some());
            }
            assert_eq!(store.get_event(outsider.id).unwrap().status, ErrorStatus::Open);
        }

        #[test]
        fn group_status_for_missing_group_fails() {
            let store = MemoryEventStore::new();
            let result = store.update_group_status(GroupId(5), ErrorStatus::Ignored);
            assert!(matches!(result, Err(EventError::GroupNotFound { id: 5 })));
        }
    }
}

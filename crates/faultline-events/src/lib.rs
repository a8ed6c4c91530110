//! # faultline-events
//!
//! Error event model, content fingerprinting and grouping for Faultline.
//!
//! This crate provides:
//!
//! - [`ErrorEvent`] / [`NewErrorEvent`]: stored and incoming error occurrences
//! - [`fingerprint()`]: the content hash that decides which group an error joins
//! - [`ErrorGroup`] / [`upsert_group`]: one aggregate per fingerprint
//! - [`EventStore`] / [`EventQuery`] / [`GroupStore`]: the storage boundary
//! - [`MemoryEventStore`]: bounded in-memory storage
//! - [`StatsSummary`] / [`TopError`]: period statistics
//!
//! ## Example
//!
//! ```rust
//! use chrono::Utc;
//! use faultline_events::{
//!     fingerprint, upsert_group, ErrorType, EventStore, GroupCandidate, MemoryEventStore,
//!     NewErrorEvent, Severity,
//! };
//!
//! let store = MemoryEventStore::new();
//! let event = NewErrorEvent::new("user 42 not found", ErrorType::Database, Severity::High, "backend");
//!
//! let candidate = GroupCandidate {
//!     fingerprint: fingerprint(event.error_type, &event.message, None, None),
//!     error_type: event.error_type,
//!     severity: event.severity,
//!     source: event.source.clone(),
//!     message_pattern: faultline_events::fingerprint::normalize_message(&event.message),
//! };
//! let group = upsert_group(&store, candidate, Utc::now()).unwrap();
//! let stored = store.append(event, Some(group.id)).unwrap();
//!
//! assert_eq!(stored.group_id, Some(group.id));
//! assert_eq!(group.message_pattern, "user <N> not found");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod fingerprint;
pub mod group;
pub mod stats;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{EventError, Result};
pub use fingerprint::fingerprint;
pub use group::{upsert_group, ErrorGroup, GroupCandidate};
pub use stats::{StatsSummary, TopError, MAX_PERIOD_DAYS};
pub use store::{EventStoreConfig, MemoryEventStore};
pub use traits::{EventQuery, EventStore, GroupStore};
pub use types::{
    ErrorEvent, ErrorStatus, ErrorType, EventFilter, EventId, EventUpdate, GroupId, NewErrorEvent,
    Severity, TimeRange,
};

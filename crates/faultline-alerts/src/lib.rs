//! Alert rules, condition evaluation and notification dispatch for Faultline.
//!
//! `faultline-alerts` decides, for every newly stored error event, which
//! operator-defined rules fire and notifies their channels.
//!
//! # Features
//!
//! - **Alert Rules**: five condition kinds over the event history, with
//!   optional type/severity/source filters
//! - **Cooldown**: a per-rule quiet period claimed with an atomic
//!   compare-and-set on the rule store
//! - **Channels**: email (SMTP), Slack, generic webhooks, SMS (Twilio) and
//!   Discord behind one [`Transport`] trait
//! - **Isolation**: a failing rule or channel never stops the others
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use faultline_alerts::{evaluate, AlertRule, ConditionKind, EngineConfig};
//! use faultline_events::{ErrorType, EventStore, MemoryEventStore, NewErrorEvent, Severity};
//!
//! let store = MemoryEventStore::new();
//! let now = Utc::now();
//! for i in 0..12 {
//!     let event = NewErrorEvent::new(format!("query {i} timed out"), ErrorType::Database, Severity::High, "api")
//!         .at(now - Duration::minutes(1));
//!     store.append(event, None).unwrap();
//! }
//! let latest = store
//!     .append(NewErrorEvent::new("query timed out", ErrorType::Database, Severity::High, "api"), None)
//!     .unwrap();
//!
//! let rule = AlertRule::builder("database errors", ConditionKind::ErrorCount)
//!     .param("threshold", 10)
//!     .param("time_window_minutes", 5)
//!     .error_type(ErrorType::Database)
//!     .build()
//!     .unwrap();
//!
//! assert!(evaluate(&rule, &latest, &store, now, &EngineConfig::default()).unwrap());
//! ```
//!
//! In a service, the [`AlertEngine`] runs this for every active rule via
//! [`AlertEngine::on_error_event_persisted`] and dispatches notifications for
//! the rules that fire.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod manager;
pub mod render;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use channels::{
    DeliveryOutcome, DiscordTransport, EmailTransport, SlackTransport, SmsTransport, Transport,
    Transports, WebhookTransport,
};
pub use dispatcher::Dispatcher;
pub use error::{AlertError, Result};
pub use evaluator::evaluate;
pub use manager::{AlertEngine, EngineConfig, EvaluationResult};
pub use render::{render_notification, RenderedNotification};
pub use store::{MemoryRuleStore, RuleStore};
pub use types::{
    AlertCondition, AlertRule, AlertRuleBuilder, ChannelConfig, ChannelKind, ConditionKind,
    ErrorCountParams, ErrorRateParams, ErrorSpikeParams, NotificationLog,
};

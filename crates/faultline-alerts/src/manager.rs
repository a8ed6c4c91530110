//! Alert engine for evaluating rules against newly stored error events.
//!
//! This module provides the [`AlertEngine`], the entry point of the alerting
//! side. For every persisted event it walks the active rules and, per rule:
//! - skips rules whose filters do not match the event
//! - skips rules still in cooldown
//! - evaluates the rule's condition against the event history
//! - claims the cooldown window with a compare-and-set on the rule store
//! - dispatches notifications and appends one log per attempted channel
//!
//! A failure on one rule is logged and counted; the remaining rules are
//! still evaluated.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use faultline_events::{ErrorEvent, EventStore};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::Transports;
use crate::cooldown;
use crate::dispatcher::Dispatcher;
use crate::evaluator::evaluate;
use crate::store::RuleStore;

/// Configuration for the alert engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied to each channel send (in seconds).
    pub channel_timeout_secs: u64,
    /// How far back `NEW_ERROR_TYPE` looks for identical events (in hours).
    pub new_error_lookback_hours: u32,
    /// Fewest errors in the window before `ERROR_RATE` can fire.
    pub min_errors_for_rate: u64,
    /// Recent count that fires `ERROR_SPIKE` when the baseline is empty.
    pub spike_min_recent: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_timeout_secs: 10,
            new_error_lookback_hours: 24,
            min_errors_for_rate: 10,
            spike_min_recent: 5,
        }
    }
}

impl EngineConfig {
    /// Returns the per-channel send timeout.
    #[must_use]
    pub const fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs)
    }
}

/// The result of evaluating the rules for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationResult {
    /// Number of rules whose condition was evaluated.
    pub rules_evaluated: usize,
    /// Number of matching rules skipped because of cooldown.
    pub rules_skipped_cooldown: usize,
    /// Number of rules that errored.
    pub rules_errored: usize,
    /// IDs of the rules that fired.
    pub rules_triggered: Vec<String>,
    /// Notifications delivered.
    pub notifications_sent: usize,
    /// Notification failures.
    pub notification_failures: usize,
}

/// Evaluates alert rules for persisted error events and sends notifications.
#[derive(Clone)]
pub struct AlertEngine {
    config: EngineConfig,
    events: Arc<dyn EventStore>,
    rules: Arc<dyn RuleStore>,
    dispatcher: Arc<Dispatcher>,
}

impl fmt::Debug for AlertEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertEngine")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl AlertEngine {
    /// Creates an engine with default configuration.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, rules: Arc<dyn RuleStore>, transports: Transports) -> Self {
        Self::with_config(events, rules, transports, EngineConfig::default())
    }

    /// Creates an engine with custom configuration.
    #[must_use]
    pub fn with_config(
        events: Arc<dyn EventStore>,
        rules: Arc<dyn RuleStore>,
        transports: Transports,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(transports, config.channel_timeout()));
        Self {
            config,
            events,
            rules,
            dispatcher,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the rule store.
    #[must_use]
    pub fn rules(&self) -> &Arc<dyn RuleStore> {
        &self.rules
    }

    /// Evaluates every active rule for a newly persisted event.
    ///
    /// The event must already be stored and grouped.
    pub async fn on_error_event_persisted(&self, event: &ErrorEvent) -> EvaluationResult {
        self.evaluate_at(event, Utc::now()).await
    }

    /// Runs [`Self::on_error_event_persisted`] on a background task.
    ///
    /// The caller does not wait for evaluation or delivery; the handle can be
    /// awaited for the result.
    pub fn spawn_evaluation(&self, event: ErrorEvent) -> JoinHandle<EvaluationResult> {
        let engine = self.clone();
        tokio::spawn(async move { engine.on_error_event_persisted(&event).await })
    }

    /// Evaluates every active rule for an event as of `now`.
    pub async fn evaluate_at(&self, event: &ErrorEvent, now: DateTime<Utc>) -> EvaluationResult {
        let mut result = EvaluationResult::default();

        let rules = match self.rules.list_active_rules() {
            Ok(rules) => rules,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "failed to list alert rules");
                return result;
            }
        };
        let group = event.group_id.and_then(|id| self.events.get_group(id));

        for rule in rules {
            if !rule.applies_to(event) {
                continue;
            }

            if !cooldown::is_eligible(&rule, now) {
                result.rules_skipped_cooldown += 1;
                debug!(
                    rule_id = %rule.id,
                    cooldown_ends_at = ?cooldown::cooldown_ends_at(&rule),
                    "rule in cooldown"
                );
                continue;
            }

            result.rules_evaluated += 1;

            match evaluate(&rule, event, self.events.as_ref(), now, &self.config) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    result.rules_errored += 1;
                    warn!(
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        error = %e,
                        "failed to evaluate rule"
                    );
                    continue;
                }
            }

            match self
                .rules
                .compare_and_set_last_triggered(&rule.id, rule.last_triggered, now)
            {
                Ok(true) => {}
                Ok(false) => {
                    result.rules_skipped_cooldown += 1;
                    debug!(rule_id = %rule.id, "cooldown claimed by a concurrent evaluation");
                    continue;
                }
                Err(e) => {
                    result.rules_errored += 1;
                    warn!(rule_id = %rule.id, error = %e, "failed to record rule trigger");
                    continue;
                }
            }

            info!(
                rule_id = %rule.id,
                rule_name = %rule.name,
                event_id = %event.id,
                condition = %rule.condition,
                "alert rule triggered"
            );
            result.rules_triggered.push(rule.id.clone());

            let logs = self.dispatcher.dispatch(&rule, event, group.as_ref()).await;
            for log in logs {
                if log.sent_successfully {
                    result.notifications_sent += 1;
                } else {
                    result.notification_failures += 1;
                }
                if let Err(e) = self.rules.append_notification_log(log) {
                    warn!(rule_id = %rule.id, error = %e, "failed to store notification log");
                }
            }
        }

        debug!(
            event_id = %event.id,
            rules_evaluated = result.rules_evaluated,
            rules_triggered = result.rules_triggered.len(),
            "evaluation complete"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::testing::{Behaviour, RecordingTransport};
    use crate::error::Result;
    use crate::store::MemoryRuleStore;
    use crate::types::{AlertRule, ChannelConfig, ChannelKind, ConditionKind, NotificationLog};
    use chrono::Duration as ChronoDuration;
    use faultline_events::{
        fingerprint, upsert_group, ErrorType, GroupCandidate, MemoryEventStore, NewErrorEvent,
        Severity,
    };

    struct Harness {
        events: Arc<MemoryEventStore>,
        rules: Arc<MemoryRuleStore>,
        slack: Arc<RecordingTransport>,
        engine: AlertEngine,
    }

    fn harness(rules: Vec<AlertRule>) -> Harness {
        let events = Arc::new(MemoryEventStore::new());
        let rules = Arc::new(MemoryRuleStore::with_rules(rules).unwrap());
        let slack = RecordingTransport::new(ChannelKind::Slack, Behaviour::Deliver);
        let engine = AlertEngine::new(
            events.clone(),
            rules.clone(),
            Transports::new().with(slack.clone()),
        );
        Harness {
            events,
            rules,
            slack,
            engine,
        }
    }

    fn slack_rule(name: &str, kind: ConditionKind) -> AlertRule {
        AlertRule::builder(name, kind)
            .channel(
                ChannelKind::Slack,
                ChannelConfig::with_recipient("https://hooks.example.com/ops"),
            )
            .build()
            .unwrap()
    }

    fn ingest(store: &MemoryEventStore, event: NewErrorEvent) -> ErrorEvent {
        let now = Utc::now();
        let group = upsert_group(
            store,
            GroupCandidate {
                fingerprint: fingerprint(event.error_type, &event.message, None, None),
                error_type: event.error_type,
                severity: event.severity,
                source: event.source.clone(),
                message_pattern: event.message.clone(),
            },
            now,
        )
        .unwrap();
        store.append(event, Some(group.id)).unwrap()
    }

    fn critical(message: &str) -> NewErrorEvent {
        NewErrorEvent::new(message, ErrorType::Database, Severity::Critical, "api")
    }

    #[tokio::test]
    async fn triggered_rule_notifies_and_records() {
        let rule = slack_rule("critical", ConditionKind::CriticalError);
        let h = harness(vec![rule.clone()]);
        let event = ingest(&h.events, critical("db down"));

        let result = h.engine.on_error_event_persisted(&event).await;

        assert_eq!(result.rules_evaluated, 1);
        assert_eq!(result.rules_triggered, vec![rule.id.clone()]);
        assert_eq!(result.notifications_sent, 1);
        assert_eq!(h.slack.count(), 1);
        assert!(h.rules.get_rule(&rule.id).unwrap().last_triggered.is_some());
        let logs = h.rules.notification_logs(&rule.id);
        assert_eq!(logs.len(), 1);
        assert!(logs[0].sent_successfully);
    }

    #[tokio::test]
    async fn cooldown_blocks_second_trigger_for_any_group() {
        let rule = slack_rule("critical", ConditionKind::CriticalError);
        let h = harness(vec![rule.clone()]);
        let now = Utc::now();

        let first = ingest(&h.events, critical("db down"));
        let second = ingest(&h.events, critical("cache down"));
        h.engine.evaluate_at(&first, now).await;
        let result = h.engine.evaluate_at(&second, now + ChronoDuration::minutes(10)).await;

        assert_eq!(result.rules_skipped_cooldown, 1);
        assert!(result.rules_triggered.is_empty());
        assert_eq!(h.slack.count(), 1);

        let result = h.engine.evaluate_at(&second, now + ChronoDuration::minutes(20)).await;
        assert_eq!(result.rules_triggered.len(), 1);
        assert_eq!(h.slack.count(), 2);
    }

    #[tokio::test]
    async fn non_matching_filters_skip_rule() {
        let rule = AlertRule::builder("auth only", ConditionKind::CriticalError)
            .error_type(ErrorType::Auth)
            .channel(ChannelKind::Slack, ChannelConfig::with_recipient("https://hooks.example.com/ops"))
            .build()
            .unwrap();
        let h = harness(vec![rule]);
        let event = ingest(&h.events, critical("db down"));

        let result = h.engine.on_error_event_persisted(&event).await;

        assert_eq!(result, EvaluationResult::default());
        assert_eq!(h.slack.count(), 0);
    }

    #[tokio::test]
    async fn false_condition_leaves_cooldown_untouched() {
        let rule = slack_rule("critical", ConditionKind::CriticalError);
        let h = harness(vec![rule.clone()]);
        let event = ingest(
            &h.events,
            NewErrorEvent::new("slow", ErrorType::Performance, Severity::Low, "api"),
        );

        let result = h.engine.on_error_event_persisted(&event).await;

        assert_eq!(result.rules_evaluated, 1);
        assert!(result.rules_triggered.is_empty());
        assert!(h.rules.get_rule(&rule.id).unwrap().last_triggered.is_none());
    }

    #[tokio::test]
    async fn notification_includes_group_occurrences() {
        let rule = slack_rule("critical", ConditionKind::CriticalError);
        let h = harness(vec![rule]);
        ingest(&h.events, critical("timeout after 100ms"));
        ingest(&h.events, critical("timeout after 200ms"));
        let event = ingest(&h.events, critical("timeout after 300ms"));

        h.engine.on_error_event_persisted(&event).await;

        let sent = h.slack.sent.lock();
        assert!(sent[0].subject.ends_with("(3 occurrences)"));
        assert!(sent[0].body.contains("**Occurrences:** 3"));
    }

    /// Rule store that also hands out one rule it never validated.
    struct WithBrokenRule {
        inner: MemoryRuleStore,
        broken: AlertRule,
    }

    impl RuleStore for WithBrokenRule {
        fn list_active_rules(&self) -> Result<Vec<AlertRule>> {
            let mut rules = vec![self.broken.clone()];
            rules.extend(self.inner.list_active_rules()?);
            Ok(rules)
        }
        fn get_rule(&self, id: &str) -> Option<AlertRule> {
            self.inner.get_rule(id)
        }
        fn insert_rule(&self, rule: AlertRule) -> Result<()> {
            self.inner.insert_rule(rule)
        }
        fn update_rule(&self, rule: AlertRule) -> Result<()> {
            self.inner.update_rule(rule)
        }
        fn remove_rule(&self, id: &str) -> bool {
            self.inner.remove_rule(id)
        }
        fn compare_and_set_last_triggered(
            &self,
            id: &str,
            expected: Option<DateTime<Utc>>,
            new: DateTime<Utc>,
        ) -> Result<bool> {
            self.inner.compare_and_set_last_triggered(id, expected, new)
        }
        fn append_notification_log(&self, log: NotificationLog) -> Result<()> {
            self.inner.append_notification_log(log)
        }
        fn notification_logs(&self, rule_id: &str) -> Vec<NotificationLog> {
            self.inner.notification_logs(rule_id)
        }
    }

    #[tokio::test]
    async fn failing_rule_does_not_stop_others() {
        let mut broken = slack_rule("broken", ConditionKind::ErrorCount);
        broken
            .condition_params
            .insert("threshold".to_string(), serde_json::json!(-1));
        let good = slack_rule("good", ConditionKind::CriticalError);

        let events = Arc::new(MemoryEventStore::new());
        let slack = RecordingTransport::new(ChannelKind::Slack, Behaviour::Deliver);
        let rules = Arc::new(WithBrokenRule {
            inner: MemoryRuleStore::with_rules([good.clone()]).unwrap(),
            broken,
        });
        let engine = AlertEngine::new(events.clone(), rules, Transports::new().with(slack.clone()));
        let event = ingest(&events, critical("db down"));

        let result = engine.on_error_event_persisted(&event).await;

        assert_eq!(result.rules_evaluated, 2);
        assert_eq!(result.rules_errored, 1);
        assert_eq!(result.rules_triggered, vec![good.id]);
        assert_eq!(slack.count(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_still_advances_cooldown() {
        let rule = AlertRule::builder("critical", ConditionKind::CriticalError)
            .channel(ChannelKind::Sms, ChannelConfig::with_recipient("+15551234"))
            .build()
            .unwrap();
        let events = Arc::new(MemoryEventStore::new());
        let rules = Arc::new(MemoryRuleStore::with_rules([rule.clone()]).unwrap());
        let sms = RecordingTransport::new(ChannelKind::Sms, Behaviour::Reject);
        let engine = AlertEngine::new(events.clone(), rules.clone(), Transports::new().with(sms));
        let event = ingest(&events, critical("db down"));

        let result = engine.on_error_event_persisted(&event).await;

        assert_eq!(result.notification_failures, 1);
        assert_eq!(result.rules_triggered.len(), 1);
        assert!(rules.get_rule(&rule.id).unwrap().last_triggered.is_some());
        assert!(!rules.notification_logs(&rule.id)[0].sent_successfully);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_evaluations_trigger_once() {
        let rule = slack_rule("critical", ConditionKind::CriticalError);
        let h = harness(vec![rule]);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let event = ingest(&h.events, critical(&format!("db down {i}")));
                h.engine.spawn_evaluation(event)
            })
            .collect();

        let mut triggered = 0;
        for handle in handles {
            triggered += handle.await.unwrap().rules_triggered.len();
        }

        assert_eq!(triggered, 1);
        assert_eq!(h.slack.count(), 1);
    }

    #[test]
    fn default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.channel_timeout(), Duration::from_secs(10));
        assert_eq!(config.new_error_lookback_hours, 24);
        assert_eq!(config.min_errors_for_rate, 10);
        assert_eq!(config.spike_min_recent, 5);
    }
}

//! Notification dispatch.
//!
//! One dispatch renders the notification once and attempts every channel of
//! the rule in order. Each channel is isolated: a missing recipient or
//! transport skips it, and a failed or timed-out send is recorded in that
//! channel's log without affecting the others.

use std::time::Duration;

use chrono::Utc;
use faultline_events::{ErrorEvent, ErrorGroup};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::channels::{DeliveryOutcome, Transports};
use crate::render::render_notification;
use crate::types::{AlertRule, ChannelKind, NotificationLog};

/// Sends a rule's notifications through the registered transports.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transports: Transports,
    channel_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher with a per-channel send timeout.
    #[must_use]
    pub const fn new(transports: Transports, channel_timeout: Duration) -> Self {
        Self {
            transports,
            channel_timeout,
        }
    }

    /// Returns the transport registry.
    #[must_use]
    pub const fn transports(&self) -> &Transports {
        &self.transports
    }

    /// Notifies every channel of `rule` about `event`.
    ///
    /// Returns one log per attempted channel; skipped channels produce none.
    pub async fn dispatch(
        &self,
        rule: &AlertRule,
        event: &ErrorEvent,
        group: Option<&ErrorGroup>,
    ) -> Vec<NotificationLog> {
        let rendered = render_notification(rule, event, group);
        let metadata = event_metadata(event);
        let mut logs = Vec::with_capacity(rule.notification_channels.len());

        for &channel in &rule.notification_channels {
            let mut config = rule.channel_config(channel);
            if channel == ChannelKind::Discord {
                config.insert("severity", event.severity.as_str());
            }

            let Some(recipient) = config.recipient().map(str::to_string) else {
                warn!(rule_id = %rule.id, channel = %channel, "no recipient configured, skipping channel");
                continue;
            };
            let Some(transport) = self.transports.get(channel) else {
                warn!(rule_id = %rule.id, channel = %channel, "no transport registered, skipping channel");
                continue;
            };

            let send = transport.send(&recipient, &rendered.subject, &rendered.body, &config);
            let outcome = match tokio::time::timeout(self.channel_timeout, send).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => DeliveryOutcome::failed(e.to_string()),
                Err(_) => DeliveryOutcome::failed(format!(
                    "timed out after {}s",
                    self.channel_timeout.as_secs_f64()
                )),
            };

            if outcome.success {
                info!(rule_id = %rule.id, channel = %channel, recipient = %recipient, "notification sent");
            } else {
                warn!(
                    rule_id = %rule.id,
                    channel = %channel,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "notification failed"
                );
            }

            logs.push(NotificationLog {
                id: Uuid::new_v4().to_string(),
                rule_id: rule.id.clone(),
                channel,
                recipient,
                subject: rendered.subject.clone(),
                message: rendered.body.clone(),
                sent_successfully: outcome.success,
                error_message: outcome.error,
                metadata: metadata.clone(),
                sent_at: Utc::now(),
            });
        }

        logs
    }
}

fn event_metadata(event: &ErrorEvent) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("error_id".to_string(), json!(event.id.0));
    metadata.insert("error_type".to_string(), json!(event.error_type.as_str()));
    metadata.insert("severity".to_string(), json!(event.severity.as_str()));
    metadata
}

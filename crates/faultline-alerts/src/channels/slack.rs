//! Slack incoming-webhook transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use super::{outcome_from_response, request_failed, DeliveryOutcome, Transport};
use crate::error::Result;
use crate::types::{ChannelConfig, ChannelKind};

/// Posts to a Slack incoming webhook; the recipient is the webhook URL.
#[derive(Debug, Clone)]
pub struct SlackTransport {
    client: reqwest::Client,
}

impl SlackTransport {
    /// Creates a Slack transport using the given HTTP client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the Block Kit payload.
    #[must_use]
    pub fn payload(subject: &str, body: &str, now: DateTime<Utc>) -> Value {
        json!({
            "text": subject,
            "blocks": [
                {
                    "type": "header",
                    "text": {"type": "plain_text", "text": format!("🚨 {subject}")}
                },
                {
                    "type": "section",
                    "text": {"type": "mrkdwn", "text": body}
                },
                {
                    "type": "context",
                    "elements": [
                        {"type": "mrkdwn", "text": format!("⏰ {}", now.format("%Y-%m-%d %H:%M:%S UTC"))}
                    ]
                }
            ]
        })
    }
}

#[async_trait]
impl Transport for SlackTransport {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        _config: &ChannelConfig,
    ) -> Result<DeliveryOutcome> {
        let payload = Self::payload(subject, body, Utc::now());
        debug!(channel = "slack", "posting slack notification");

        let response = self
            .client
            .post(recipient)
            .json(&payload)
            .send()
            .await
            .map_err(|e| request_failed("Slack", &e))?;

        Ok(outcome_from_response("Slack", response, |status| status == 200).await)
    }
}

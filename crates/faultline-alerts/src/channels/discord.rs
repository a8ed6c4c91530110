//! Discord webhook transport.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use faultline_events::Severity;
use serde_json::{json, Value};

use super::{outcome_from_response, request_failed, DeliveryOutcome, Transport};
use crate::error::Result;
use crate::types::{ChannelConfig, ChannelKind};

/// Embed colour used when no severity is configured.
pub const DEFAULT_COLOR: u32 = 15_158_332;

/// Returns the embed colour for a severity.
#[must_use]
pub const fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::Low => 3_066_993,
        Severity::Medium => 16_776_960,
        Severity::High => 16_744_192,
        Severity::Critical => 15_158_332,
    }
}

/// Posts an embed to a Discord webhook; the recipient is the webhook URL.
///
/// The dispatcher sets `severity` in the channel configuration so the embed
/// can be coloured.
#[derive(Debug, Clone)]
pub struct DiscordTransport {
    client: reqwest::Client,
}

impl DiscordTransport {
    /// Creates a Discord transport using the given HTTP client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the embed payload.
    #[must_use]
    pub fn payload(subject: &str, body: &str, config: &ChannelConfig, now: DateTime<Utc>) -> Value {
        let color = config
            .get("severity")
            .cloned()
            .and_then(|v| serde_json::from_value::<Severity>(v).ok())
            .map_or(DEFAULT_COLOR, severity_color);

        json!({
            "embeds": [{
                "title": format!("🚨 {subject}"),
                "description": body,
                "color": color,
                "timestamp": now.to_rfc3339(),
                "footer": {"text": "Faultline"}
            }]
        })
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        config: &ChannelConfig,
    ) -> Result<DeliveryOutcome> {
        let payload = Self::payload(subject, body, config, Utc::now());

        let response = self
            .client
            .post(recipient)
            .json(&payload)
            .send()
            .await
            .map_err(|e| request_failed("Discord", &e))?;

        Ok(outcome_from_response("Discord", response, |status| status == 204).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::test_server::{client, serve_once};
    use test_case::test_case;

    #[test_case("LOW", 3_066_993 ; "low")]
    #[test_case("MEDIUM", 16_776_960 ; "medium")]
    #[test_case("HIGH", 16_744_192 ; "high")]
    #[test_case("CRITICAL", 15_158_332 ; "critical")]
    #[test_case("BOGUS", DEFAULT_COLOR ; "unknown")]
    fn color_by_severity(severity: &str, expected: u32) {
        let config = ChannelConfig::new().set("severity", severity);
        let payload = DiscordTransport::payload("s", "m", &config, Utc::now());
        assert_eq!(payload["embeds"][0]["color"], expected);
    }

    #[test]
    fn color_without_severity() {
        let payload = DiscordTransport::payload("s", "m", &ChannelConfig::new(), Utc::now());
        assert_eq!(payload["embeds"][0]["color"], DEFAULT_COLOR);
        assert_eq!(payload["embeds"][0]["title"], "🚨 s");
    }

    #[tokio::test]
    async fn no_content_is_delivered() {
        let (url, _) = serve_once(204, "").await;
        let transport = DiscordTransport::new(client());

        let outcome = transport
            .send(&url, "s", "m", &ChannelConfig::new())
            .await
            .unwrap();

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn ok_is_not_no_content() {
        let (url, _) = serve_once(200, "").await;
        let transport = DiscordTransport::new(client());

        let outcome = transport
            .send(&url, "s", "m", &ChannelConfig::new())
            .await
            .unwrap();

        assert!(!outcome.success);
    }
}

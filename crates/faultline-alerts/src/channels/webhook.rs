//! Generic HTTP webhook transport.
//!
//! Channel configuration:
//! - `method`: HTTP method, `POST` when absent
//! - `headers`: object of extra request headers
//! - `custom_fields`: object merged into the JSON payload

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};

use super::{outcome_from_response, request_failed, DeliveryOutcome, Transport};
use crate::error::Result;
use crate::types::{ChannelConfig, ChannelKind};

/// Value of the `source` field in webhook payloads.
pub const PAYLOAD_SOURCE: &str = "faultline";

/// Sends a JSON payload to an arbitrary URL; the recipient is the URL.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Creates a webhook transport using the given HTTP client.
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the payload, merging `custom_fields` over the standard fields.
    #[must_use]
    pub fn payload(subject: &str, body: &str, config: &ChannelConfig, now: DateTime<Utc>) -> Value {
        let mut payload = json!({
            "subject": subject,
            "message": body,
            "timestamp": now.to_rfc3339(),
            "source": PAYLOAD_SOURCE,
        });
        if let (Some(fields), Value::Object(map)) = (config.get_object("custom_fields"), &mut payload) {
            for (key, value) in fields {
                map.insert(key.clone(), value.clone());
            }
        }
        payload
    }
}

#[async_trait]
impl Transport for WebhookTransport {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        config: &ChannelConfig,
    ) -> Result<DeliveryOutcome> {
        let method_name = config.get_str("method").unwrap_or("POST").to_ascii_uppercase();
        let Ok(method) = Method::from_bytes(method_name.as_bytes()) else {
            return Ok(DeliveryOutcome::failed(format!("invalid HTTP method: {method_name}")));
        };

        let payload = Self::payload(subject, body, config, Utc::now());
        let mut request = self.client.request(method, recipient).json(&payload);
        if let Some(headers) = config.get_object("headers") {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_failed("Webhook", &e))?;

        Ok(outcome_from_response("Webhook", response, |status| (200..300).contains(&status)).await)
    }
}

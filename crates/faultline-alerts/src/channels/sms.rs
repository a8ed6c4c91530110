//! SMS transport using the Twilio REST API.

use async_trait::async_trait;

use super::{outcome_from_response, request_failed, DeliveryOutcome, Transport};
use crate::error::Result;
use crate::types::{ChannelConfig, ChannelKind};

/// Longest SMS body sent, in characters.
pub const MAX_SMS_CHARS: usize = 160;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Sends SMS messages through Twilio; the recipient is a phone number.
///
/// Reads `twilio_account_sid`, `twilio_auth_token` and
/// `twilio_phone_number` from the channel configuration.
#[derive(Debug, Clone)]
pub struct SmsTransport {
    client: reqwest::Client,
    api_base: String,
}

impl SmsTransport {
    /// Creates an SMS transport using the given HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Points the transport at a different API host.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Truncates a body to the SMS limit on a character boundary.
    #[must_use]
    pub fn truncate(body: &str) -> String {
        body.chars().take(MAX_SMS_CHARS).collect()
    }
}

#[async_trait]
impl Transport for SmsTransport {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(
        &self,
        recipient: &str,
        _subject: &str,
        body: &str,
        config: &ChannelConfig,
    ) -> Result<DeliveryOutcome> {
        let (Some(account_sid), Some(auth_token), Some(from)) = (
            config.get_str("twilio_account_sid"),
            config.get_str("twilio_auth_token"),
            config.get_str("twilio_phone_number"),
        ) else {
            return Ok(DeliveryOutcome::failed("incomplete Twilio configuration"));
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.api_base
        );
        let text = Self::truncate(body);

        let response = self
            .client
            .post(url)
            .basic_auth(account_sid, Some(auth_token))
            .form(&[("From", from), ("To", recipient), ("Body", text.as_str())])
            .send()
            .await
            .map_err(|e| request_failed("Twilio", &e))?;

        Ok(outcome_from_response("Twilio", response, |status| status == 201).await)
    }
}

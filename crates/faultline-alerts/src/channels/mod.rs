//! Notification transports.
//!
//! Each [`ChannelKind`] maps to one [`Transport`] implementation. The
//! dispatcher only knows the trait; [`Transports`] is the registry it looks
//! transports up in. Transports report non-success provider responses as a
//! failed [`DeliveryOutcome`] and network-level errors as
//! `AlertError::NotificationFailed`; the dispatcher records both the same way.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{AlertError, Result};
use crate::types::{ChannelConfig, ChannelKind};

pub mod discord;
pub mod email;
pub mod slack;
pub mod sms;
pub mod webhook;

pub use discord::DiscordTransport;
pub use email::EmailTransport;
pub use slack::SlackTransport;
pub use sms::SmsTransport;
pub use webhook::WebhookTransport;

/// Result of one delivery attempt as reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Whether the provider accepted the notification.
    pub success: bool,
    /// Failure detail.
    pub error: Option<String>,
}

impl DeliveryOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub const fn delivered() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// A notification transport for one channel kind.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// The channel kind this transport serves.
    fn kind(&self) -> ChannelKind;

    /// Sends one notification.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the provider cannot be
    /// reached at all.
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        config: &ChannelConfig,
    ) -> Result<DeliveryOutcome>;
}

/// Registry of transports keyed by channel kind.
#[derive(Debug, Clone, Default)]
pub struct Transports {
    inner: HashMap<ChannelKind, Arc<dyn Transport>>,
}

impl Transports {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in transport for every channel kind.
    #[must_use]
    pub fn standard() -> Self {
        let client = reqwest::Client::new();
        Self::new()
            .with(Arc::new(EmailTransport::new()))
            .with(Arc::new(SlackTransport::new(client.clone())))
            .with(Arc::new(WebhookTransport::new(client.clone())))
            .with(Arc::new(SmsTransport::new(client.clone())))
            .with(Arc::new(DiscordTransport::new(client)))
    }

    /// Registers a transport, replacing any previous one for its kind.
    #[must_use]
    pub fn with(mut self, transport: Arc<dyn Transport>) -> Self {
        self.register(transport);
        self
    }

    /// Registers a transport in place.
    pub fn register(&mut self, transport: Arc<dyn Transport>) {
        self.inner.insert(transport.kind(), transport);
    }

    /// Gets the transport for a channel kind.
    #[must_use]
    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn Transport>> {
        self.inner.get(&kind).cloned()
    }

    /// Returns the number of registered transports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if no transport is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Turns an HTTP response into an outcome, reading the body on failure.
pub(crate) async fn outcome_from_response(
    provider: &str,
    response: reqwest::Response,
    accept: impl Fn(u16) -> bool,
) -> DeliveryOutcome {
    let status = response.status().as_u16();
    if accept(status) {
        return DeliveryOutcome::delivered();
    }
    let body = response.text().await.unwrap_or_default();
    DeliveryOutcome::failed(format!("{provider} returned status {status}: {body}"))
}

pub(crate) fn request_failed(provider: &str, err: &reqwest::Error) -> AlertError {
    AlertError::NotificationFailed {
        reason: format!("{provider} request failed: {err}"),
    }
}

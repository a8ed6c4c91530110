//! SMTP email transport.
//!
//! Channel configuration: `smtp_host`, `smtp_port` (587 when absent),
//! `smtp_user`, `smtp_password` and `from_email` (falls back to the SMTP user).

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryOutcome, Transport};
use crate::error::{AlertError, Result};
use crate::types::{ChannelConfig, ChannelKind};

/// Port used when `smtp_port` is not configured.
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Sends HTML email over SMTP with STARTTLS; the recipient is an address.
#[derive(Debug, Clone, Default)]
pub struct EmailTransport;

struct SmtpSettings<'a> {
    host: &'a str,
    port: u16,
    user: &'a str,
    password: &'a str,
    from: &'a str,
}

impl<'a> SmtpSettings<'a> {
    fn from_config(config: &'a ChannelConfig) -> Option<Self> {
        let host = config.get_str("smtp_host")?;
        let user = config.get_str("smtp_user")?;
        let password = config.get_str("smtp_password")?;
        let port = config
            .get_u64("smtp_port")
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(DEFAULT_SMTP_PORT);
        let from = config.get_str("from_email").unwrap_or(user);
        Some(Self {
            host,
            port,
            user,
            password,
            from,
        })
    }
}

impl EmailTransport {
    /// Creates an email transport. SMTP connections are made per send.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the plain notification body as HTML.
    #[must_use]
    pub fn html_body(body: &str) -> String {
        let escaped = body
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!(
            "<html><body><div style=\"font-family: sans-serif\">{}</div></body></html>",
            escaped.replace('\n', "<br>\n")
        )
    }

    fn build_message(from: &str, recipient: &str, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = from.parse().map_err(|e| AlertError::NotificationFailed {
            reason: format!("invalid sender address {from}: {e}"),
        })?;
        let to: Mailbox = recipient.parse().map_err(|e| AlertError::NotificationFailed {
            reason: format!("invalid recipient address {recipient}: {e}"),
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(Self::html_body(body))
            .map_err(|e| AlertError::NotificationFailed {
                reason: format!("failed to build email: {e}"),
            })
    }
}

#[async_trait]
impl Transport for EmailTransport {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
        config: &ChannelConfig,
    ) -> Result<DeliveryOutcome> {
        let Some(settings) = SmtpSettings::from_config(config) else {
            return Ok(DeliveryOutcome::failed("incomplete SMTP configuration"));
        };

        let message = Self::build_message(settings.from, recipient, subject, body)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(settings.host)
            .map_err(|e| AlertError::NotificationFailed {
                reason: format!("invalid SMTP host {}: {e}", settings.host),
            })?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.to_string(),
                settings.password.to_string(),
            ))
            .build();

        match mailer.send(message).await {
            Ok(_) => Ok(DeliveryOutcome::delivered()),
            Err(e) => Ok(DeliveryOutcome::failed(format!("SMTP delivery failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp_config() -> ChannelConfig {
        ChannelConfig::new()
            .set("smtp_host", "smtp.example.com")
            .set("smtp_user", "alerts@example.com")
            .set("smtp_password", "secret")
    }

    #[test]
    fn settings_defaults() {
        let config = smtp_config();
        let settings = SmtpSettings::from_config(&config).unwrap();
        assert_eq!(settings.port, DEFAULT_SMTP_PORT);
        assert_eq!(settings.from, "alerts@example.com");
    }

    #[test]
    fn settings_overrides() {
        let config = smtp_config()
            .set("smtp_port", 2525)
            .set("from_email", "noreply@example.com");
        let settings = SmtpSettings::from_config(&config).unwrap();
        assert_eq!(settings.port, 2525);
        assert_eq!(settings.from, "noreply@example.com");
    }

    #[test]
    fn html_body_escapes_and_breaks_lines() {
        let html = EmailTransport::html_body("**Message:** a < b\n**Source:** api");
        assert!(html.contains("a &lt; b<br>"));
        assert!(html.contains("**Source:** api"));
    }

    #[tokio::test]
    async fn incomplete_config_fails_without_connecting() {
        let config = ChannelConfig::new().set("smtp_host", "smtp.example.com");

        let outcome = EmailTransport::new()
            .send("ops@example.com", "s", "m", &config)
            .await
            .unwrap();

        assert_eq!(outcome.error.as_deref(), Some("incomplete SMTP configuration"));
    }

    #[tokio::test]
    async fn bad_recipient_is_an_error() {
        let err = EmailTransport::new()
            .send("not an address", "s", "m", &smtp_config())
            .await
            .unwrap_err();

        assert!(matches!(err, AlertError::NotificationFailed { .. }));
        assert!(err.to_string().contains("invalid recipient address"));
    }
}

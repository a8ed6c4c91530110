//! Notification subject and body rendering.

use faultline_events::{ErrorEvent, ErrorGroup, Severity};

use crate::types::AlertRule;

/// A rendered notification, shared by every channel of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    /// One-line subject.
    pub subject: String,
    /// Markdown-flavoured body.
    pub body: String,
}

/// Returns the emoji shown in front of a severity label.
#[must_use]
pub const fn severity_emoji(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "🟢",
        Severity::Medium => "🟡",
        Severity::High => "🟠",
        Severity::Critical => "🔴",
    }
}

/// Renders the notification for an event that triggered a rule.
///
/// The occurrence count comes from the event's group; without a group the
/// event counts as a single occurrence.
#[must_use]
pub fn render_notification(
    rule: &AlertRule,
    event: &ErrorEvent,
    group: Option<&ErrorGroup>,
) -> RenderedNotification {
    let occurrences = group.map_or(1, |g| g.total_occurrences);

    let mut subject = format!(
        "{} [{}] {} Error",
        severity_emoji(event.severity),
        event.severity,
        event.error_type
    );
    if occurrences > 1 {
        subject.push_str(&format!(" ({occurrences} occurrences)"));
    }

    let mut lines = vec![
        format!("**Error Type:** {}", event.error_type),
        format!("**Severity:** {}", event.severity),
        format!("**Source:** {}", event.source),
        format!("**Message:** {}", event.message),
    ];
    if occurrences > 1 {
        lines.push(format!("**Occurrences:** {occurrences}"));
    }
    if let Some(endpoint) = event.endpoint.as_deref().filter(|e| !e.is_empty()) {
        lines.push(format!("**Endpoint:** {endpoint}"));
    }
    lines.push(format!("**Time:** {}", event.timestamp.to_rfc3339()));

    let mut body = lines.join("\n");
    body.push_str(&format!("\n\n**Alert Rule:** {}", rule.name));
    if let Some(description) = rule.description.as_deref().filter(|d| !d.is_empty()) {
        body.push_str(&format!("\n**Description:** {description}"));
    }

    RenderedNotification { subject, body }
}

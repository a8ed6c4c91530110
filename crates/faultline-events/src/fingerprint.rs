//! Content fingerprinting for error grouping.
//!
//! A fingerprint is the SHA-256 of an error's normalized identity: its type,
//! its message with volatile tokens (numbers, UUIDs, emails, URLs) replaced
//! by placeholders, its endpoint with numeric path segments collapsed, and
//! the first lines of its stack trace with line numbers removed. Errors that
//! differ only in parameters share a fingerprint; structurally different
//! errors do not.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Placeholder for a run of digits.
pub const NUMBER_PLACEHOLDER: &str = "<N>";
/// Placeholder for a UUID.
pub const UUID_PLACEHOLDER: &str = "<UUID>";
/// Placeholder for an email address.
pub const EMAIL_PLACEHOLDER: &str = "<EMAIL>";
/// Placeholder for a URL.
pub const URL_PLACEHOLDER: &str = "<URL>";
/// Placeholder for a numeric path segment.
pub const ID_SEGMENT_PLACEHOLDER: &str = "{id}";

/// Number of stack trace lines that contribute to the fingerprint.
pub const STACK_TRACE_LINES: usize = 3;

/// Separates fields in the hashed identity. ASCII unit separator never
/// appears in a message, path or trace line.
const FIELD_DELIMITER: char = '\u{1f}';

// URLs first so their digits and `@`s are not rewritten piecemeal, then UUIDs
// before bare digit runs for the same reason.
static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z][a-z0-9+.-]*://[^\s]+").unwrap_or_else(|_| unreachable!())
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b")
        .unwrap_or_else(|_| unreachable!())
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap_or_else(|_| unreachable!())
});

static DIGITS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").unwrap_or_else(|_| unreachable!()));

static STACK_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"line [0-9]+").unwrap_or_else(|_| unreachable!()));

/// Normalizes an error message into its grouping template.
///
/// ```
/// use faultline_events::fingerprint::normalize_message;
///
/// assert_eq!(
///     normalize_message("user 42 not found (ref jane@example.com)"),
///     "user <N> not found (ref <EMAIL>)"
/// );
/// ```
#[must_use]
pub fn normalize_message(message: &str) -> String {
    let normalized = URL_REGEX.replace_all(message, URL_PLACEHOLDER);
    let normalized = UUID_REGEX.replace_all(&normalized, UUID_PLACEHOLDER);
    let normalized = EMAIL_REGEX.replace_all(&normalized, EMAIL_PLACEHOLDER);
    DIGITS_REGEX
        .replace_all(&normalized, NUMBER_PLACEHOLDER)
        .into_owned()
}

/// Collapses purely numeric path segments of an endpoint.
///
/// ```
/// use faultline_events::fingerprint::normalize_endpoint;
///
/// assert_eq!(normalize_endpoint("/api/users/123/orders/9"), "/api/users/{id}/orders/{id}");
/// ```
#[must_use]
pub fn normalize_endpoint(endpoint: &str) -> String {
    endpoint
        .split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                ID_SEGMENT_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Keeps the first [`STACK_TRACE_LINES`] lines of a stack trace and strips
/// `line <n>` references from them.
#[must_use]
pub fn normalize_stack_trace(stack_trace: &str) -> String {
    let head = stack_trace
        .lines()
        .take(STACK_TRACE_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    STACK_LINE_REGEX
        .replace_all(&head, "line <N>")
        .into_owned()
}

/// Computes the grouping fingerprint of an error.
///
/// Returns 64 lowercase hex characters. Pure and deterministic.
///
/// ```
/// use faultline_events::fingerprint::fingerprint;
/// use faultline_events::ErrorType;
///
/// let a = fingerprint(ErrorType::Database, "timeout after 3000ms", Some("/orders/17"), None);
/// let b = fingerprint(ErrorType::Database, "timeout after 5000ms", Some("/orders/99"), None);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
#[must_use]
pub fn fingerprint(
    error_type: crate::ErrorType,
    message: &str,
    endpoint: Option<&str>,
    stack_trace: Option<&str>,
) -> String {
    let mut identity = String::with_capacity(message.len() + 64);
    identity.push_str(error_type.as_str());
    identity.push(FIELD_DELIMITER);
    identity.push_str(&normalize_message(message));

    if let Some(endpoint) = endpoint {
        identity.push(FIELD_DELIMITER);
        identity.push_str("endpoint=");
        identity.push_str(&normalize_endpoint(endpoint));
    }
    if let Some(stack_trace) = stack_trace {
        identity.push(FIELD_DELIMITER);
        identity.push_str("stack=");
        identity.push_str(&normalize_stack_trace(stack_trace));
    }

    hex::encode(Sha256::digest(identity.as_bytes()))
}

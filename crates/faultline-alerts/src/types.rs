//! Core types for alert rules.
//!
//! This module provides:
//! - [`ConditionKind`] and [`AlertCondition`]: what a rule checks
//! - [`ChannelKind`] and [`ChannelConfig`]: where a rule notifies
//! - [`AlertRule`] and [`AlertRuleBuilder`]: the operator-defined policy
//! - [`NotificationLog`]: the append-only delivery record

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use faultline_events::{ErrorEvent, ErrorType, EventFilter, Severity, TimeRange};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AlertError, Result};

/// The kind of condition a rule evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionKind {
    /// The triggering event is CRITICAL.
    CriticalError,
    /// Too many matching events in a window.
    ErrorCount,
    /// Matching events relative to an assumed request volume.
    ErrorRate,
    /// First occurrence of a `(type, message)` pair in the lookback.
    NewErrorType,
    /// Recent rate well above the historical baseline.
    ErrorSpike,
}

impl ConditionKind {
    /// All condition kinds.
    pub const ALL: [Self; 5] = [
        Self::CriticalError,
        Self::ErrorCount,
        Self::ErrorRate,
        Self::NewErrorType,
        Self::ErrorSpike,
    ];

    /// Returns the wire name of this condition kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalError => "CRITICAL_ERROR",
            Self::ErrorCount => "ERROR_COUNT",
            Self::ErrorRate => "ERROR_RATE",
            Self::NewErrorType => "NEW_ERROR_TYPE",
            Self::ErrorSpike => "ERROR_SPIKE",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of an `ERROR_COUNT` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorCountParams {
    /// Minimum number of matching events.
    pub threshold: u64,
    /// Window length.
    pub time_window_minutes: u32,
}

impl Default for ErrorCountParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            time_window_minutes: 5,
        }
    }
}

/// Parameters of an `ERROR_RATE` condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorRateParams {
    /// Percentage of `min_requests` that must be errors.
    pub threshold_percent: f64,
    /// Window length.
    pub time_window_minutes: u32,
    /// Assumed request volume in the window.
    pub min_requests: u64,
}

impl Default for ErrorRateParams {
    fn default() -> Self {
        Self {
            threshold_percent: 50.0,
            time_window_minutes: 15,
            min_requests: 100,
        }
    }
}

/// Parameters of an `ERROR_SPIKE` condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSpikeParams {
    /// How many times the baseline the recent count must reach.
    pub spike_multiplier: f64,
    /// Recent window length.
    pub time_window_minutes: u32,
    /// Total lookback; the baseline is the part not covered by the recent window.
    pub comparison_window_minutes: u32,
}

impl Default for ErrorSpikeParams {
    fn default() -> Self {
        Self {
            spike_multiplier: 3.0,
            time_window_minutes: 10,
            comparison_window_minutes: 60,
        }
    }
}

/// A rule's condition with its parameters resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertCondition {
    /// Fires on any CRITICAL event.
    CriticalError,
    /// Fires when the window holds at least `threshold` matching events.
    ErrorCount(ErrorCountParams),
    /// Fires when matching events reach a share of the assumed volume.
    ErrorRate(ErrorRateParams),
    /// Fires on the first `(type, message)` occurrence in the lookback.
    NewErrorType,
    /// Fires when the recent window outpaces the baseline.
    ErrorSpike(ErrorSpikeParams),
}

impl AlertCondition {
    /// Resolves a condition from its kind and a rule's parameter map.
    ///
    /// Missing parameters take their defaults; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConditionParams` if a parameter has the
    /// wrong type or an out-of-range value.
    pub fn from_parts(kind: ConditionKind, params: &Map<String, Value>) -> Result<Self> {
        let condition = match kind {
            ConditionKind::CriticalError => Self::CriticalError,
            ConditionKind::NewErrorType => Self::NewErrorType,
            ConditionKind::ErrorCount => Self::ErrorCount(parse_params(kind, params)?),
            ConditionKind::ErrorRate => Self::ErrorRate(parse_params(kind, params)?),
            ConditionKind::ErrorSpike => Self::ErrorSpike(parse_params(kind, params)?),
        };
        condition.validate()?;
        Ok(condition)
    }

    /// Returns the kind of this condition.
    #[must_use]
    pub const fn kind(&self) -> ConditionKind {
        match self {
            Self::CriticalError => ConditionKind::CriticalError,
            Self::ErrorCount(_) => ConditionKind::ErrorCount,
            Self::ErrorRate(_) => ConditionKind::ErrorRate,
            Self::NewErrorType => ConditionKind::NewErrorType,
            Self::ErrorSpike(_) => ConditionKind::ErrorSpike,
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| AlertError::InvalidConditionParams {
            condition: self.kind().to_string(),
            reason: reason.to_string(),
        };

        match self {
            Self::CriticalError | Self::NewErrorType => Ok(()),
            Self::ErrorCount(p) => {
                if p.time_window_minutes == 0 {
                    return Err(invalid("time_window_minutes must be positive"));
                }
                Ok(())
            }
            Self::ErrorRate(p) => {
                if p.time_window_minutes == 0 {
                    return Err(invalid("time_window_minutes must be positive"));
                }
                if p.min_requests == 0 {
                    return Err(invalid("min_requests must be positive"));
                }
                if !p.threshold_percent.is_finite() {
                    return Err(invalid("threshold_percent must be finite"));
                }
                Ok(())
            }
            Self::ErrorSpike(p) => {
                if p.time_window_minutes == 0 {
                    return Err(invalid("time_window_minutes must be positive"));
                }
                if p.comparison_window_minutes <= p.time_window_minutes {
                    return Err(invalid(
                        "comparison_window_minutes must exceed time_window_minutes",
                    ));
                }
                if !p.spike_multiplier.is_finite() || p.spike_multiplier < 0.0 {
                    return Err(invalid("spike_multiplier must be a non-negative number"));
                }
                Ok(())
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(kind: ConditionKind, params: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| {
        AlertError::InvalidConditionParams {
            condition: kind.to_string(),
            reason: e.to_string(),
        }
    })
}

/// A notification transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelKind {
    /// SMTP email.
    Email,
    /// Slack incoming webhook.
    Slack,
    /// Generic HTTP webhook.
    Webhook,
    /// SMS through Twilio.
    Sms,
    /// Discord webhook.
    Discord,
}

impl ChannelKind {
    /// All channel kinds.
    pub const ALL: [Self; 5] = [
        Self::Email,
        Self::Slack,
        Self::Webhook,
        Self::Sms,
        Self::Discord,
    ];

    /// Returns the wire name of this channel kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Slack => "SLACK",
            Self::Webhook => "WEBHOOK",
            Self::Sms => "SMS",
            Self::Discord => "DISCORD",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form configuration of one channel on one rule.
///
/// Every channel reads `recipient`; the rest of the keys are channel
/// specific (`smtp_host`, `headers`, `twilio_account_sid`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelConfig(Map<String, Value>);

impl ChannelConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with only a recipient.
    #[must_use]
    pub fn with_recipient(recipient: impl Into<String>) -> Self {
        Self::new().set("recipient", recipient.into())
    }

    /// Sets a key, returning the updated configuration.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Sets a key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a raw value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a non-empty string value.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Gets an unsigned integer value.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Gets an object value.
    #[must_use]
    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Returns the recipient, if one is configured.
    #[must_use]
    pub fn recipient(&self) -> Option<&str> {
        self.get_str("recipient")
    }
}

fn new_rule_id() -> String {
    Uuid::new_v4().to_string()
}

const fn default_active() -> bool {
    true
}

const fn default_cooldown() -> u32 {
    AlertRule::DEFAULT_COOLDOWN_MINUTES
}

/// An operator-defined alerting policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique identifier for the rule.
    #[serde(default = "new_rule_id")]
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description appended to notifications.
    #[serde(default)]
    pub description: Option<String>,
    /// Inactive rules are never evaluated.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// What the rule checks.
    pub condition: ConditionKind,
    /// Condition parameters; missing keys take their defaults.
    #[serde(default)]
    pub condition_params: Map<String, Value>,
    /// Only events of this type are candidates.
    #[serde(default)]
    pub error_type: Option<ErrorType>,
    /// Only events of this severity are candidates.
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Only events from this source are candidates.
    #[serde(default)]
    pub source: Option<String>,
    /// Channels to notify, in order.
    #[serde(default)]
    pub notification_channels: Vec<ChannelKind>,
    /// Per-channel configuration.
    #[serde(default)]
    pub notification_config: HashMap<ChannelKind, ChannelConfig>,
    /// Minimum minutes between two triggers.
    #[serde(default = "default_cooldown")]
    pub cooldown_minutes: u32,
    /// When the rule last fired.
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl AlertRule {
    /// Maximum allowed length for rule names.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Cooldown applied when none is given.
    pub const DEFAULT_COOLDOWN_MINUTES: u32 = 15;

    /// Creates a new alert rule builder.
    pub fn builder(name: impl Into<String>, condition: ConditionKind) -> AlertRuleBuilder {
        AlertRuleBuilder::new(name, condition)
    }

    /// Resolves the rule's condition with its parameters.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConditionParams` if the parameters do not
    /// fit the condition kind.
    pub fn resolve_condition(&self) -> Result<AlertCondition> {
        AlertCondition::from_parts(self.condition, &self.condition_params)
    }

    /// Checks the rule's name and parameters.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` for a bad name and
    /// `AlertError::InvalidConditionParams` for bad parameters.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AlertError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }

        if self.name.len() > Self::MAX_NAME_LENGTH {
            return Err(AlertError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    Self::MAX_NAME_LENGTH
                ),
            });
        }

        self.resolve_condition().map(|_| ())
    }

    /// Returns true if every filter set on the rule equals the event's field.
    #[must_use]
    pub fn applies_to(&self, event: &ErrorEvent) -> bool {
        event.matches(&self.history_filter(TimeRange::default()))
    }

    /// Builds the history filter for this rule over a time range.
    #[must_use]
    pub fn history_filter(&self, range: TimeRange) -> EventFilter {
        EventFilter {
            error_type: self.error_type,
            severity: self.severity,
            source: self.source.clone(),
            time_range: range,
        }
    }

    /// Returns the configuration of a channel, empty if none is set.
    #[must_use]
    pub fn channel_config(&self, channel: ChannelKind) -> ChannelConfig {
        self.notification_config
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }
}

/// Builder for creating [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    name: String,
    description: Option<String>,
    is_active: bool,
    condition: ConditionKind,
    condition_params: Map<String, Value>,
    error_type: Option<ErrorType>,
    severity: Option<Severity>,
    source: Option<String>,
    notification_channels: Vec<ChannelKind>,
    notification_config: HashMap<ChannelKind, ChannelConfig>,
    cooldown_minutes: u32,
    last_triggered: Option<DateTime<Utc>>,
}

impl AlertRuleBuilder {
    fn new(name: impl Into<String>, condition: ConditionKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_active: true,
            condition,
            condition_params: Map::new(),
            error_type: None,
            severity: None,
            source: None,
            notification_channels: Vec::new(),
            notification_config: HashMap::new(),
            cooldown_minutes: AlertRule::DEFAULT_COOLDOWN_MINUTES,
            last_triggered: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets whether the rule is active.
    #[must_use]
    pub const fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Sets a condition parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.condition_params.insert(key.into(), value.into());
        self
    }

    /// Restricts the rule to an error type.
    #[must_use]
    pub const fn error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = Some(error_type);
        self
    }

    /// Restricts the rule to a severity.
    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Restricts the rule to a source.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a channel with its configuration.
    #[must_use]
    pub fn channel(mut self, channel: ChannelKind, config: ChannelConfig) -> Self {
        if !self.notification_channels.contains(&channel) {
            self.notification_channels.push(channel);
        }
        self.notification_config.insert(channel, config);
        self
    }

    /// Sets the cooldown.
    #[must_use]
    pub const fn cooldown_minutes(mut self, minutes: u32) -> Self {
        self.cooldown_minutes = minutes;
        self
    }

    /// Sets the last trigger time.
    #[must_use]
    pub const fn last_triggered(mut self, at: DateTime<Utc>) -> Self {
        self.last_triggered = Some(at);
        self
    }

    /// Builds the [`AlertRule`].
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or too long, or the condition
    /// parameters do not fit the condition kind.
    pub fn build(self) -> Result<AlertRule> {
        let rule = AlertRule {
            id: new_rule_id(),
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            condition: self.condition,
            condition_params: self.condition_params,
            error_type: self.error_type,
            severity: self.severity,
            source: self.source,
            notification_channels: self.notification_channels,
            notification_config: self.notification_config,
            cooldown_minutes: self.cooldown_minutes,
            last_triggered: self.last_triggered,
        };
        rule.validate()?;
        Ok(rule)
    }
}

/// Record of one delivery attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationLog {
    /// Unique identifier.
    pub id: String,
    /// Rule that triggered the notification.
    pub rule_id: String,
    /// Channel used.
    pub channel: ChannelKind,
    /// Recipient the notification was addressed to.
    pub recipient: String,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub message: String,
    /// Whether the transport reported success.
    pub sent_successfully: bool,
    /// Failure detail.
    pub error_message: Option<String>,
    /// Context about the triggering event.
    pub metadata: Map<String, Value>,
    /// When the attempt finished.
    pub sent_at: DateTime<Utc>,
}

//! Service configuration.
//!
//! Loaded from a TOML file with these sections, all optional:
//! - `[log]`: default log filter and output format
//! - `[alerts]`: alert engine knobs
//! - `[store]`: in-memory retention
//! - `[[rules]]`: alert rules seeded at startup

use std::path::Path;

use faultline_alerts::{AlertRule, EngineConfig};
use faultline_events::EventStoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "faultline=info".to_string(),
            json: false,
        }
    }
}

/// Event store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of events kept in memory.
    pub max_events: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_events: EventStoreConfig::default().max_events,
        }
    }
}

impl StoreConfig {
    /// Converts to the event store's own configuration.
    #[must_use]
    pub fn to_store_config(&self) -> EventStoreConfig {
        EventStoreConfig {
            max_events: self.max_events,
        }
    }
}

/// Main service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
    /// Alert engine configuration.
    #[serde(default)]
    pub alerts: EngineConfig,
    /// Event store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Alert rules to load at startup.
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

impl ServiceConfig {
    /// Longest accepted `alerts.new_error_lookback_hours` (366 days).
    pub const MAX_LOOKBACK_HOURS: u32 = 24 * 366;

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServiceError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServiceError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.log.level.trim().is_empty() {
            return Err(ServiceError::Config("log.level cannot be empty".to_string()));
        }

        if self.alerts.channel_timeout_secs == 0 {
            return Err(ServiceError::Config(
                "alerts.channel_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.alerts.new_error_lookback_hours == 0 {
            return Err(ServiceError::Config(
                "alerts.new_error_lookback_hours must be greater than 0".to_string(),
            ));
        }

        if self.alerts.new_error_lookback_hours > Self::MAX_LOOKBACK_HOURS {
            return Err(ServiceError::Config(format!(
                "alerts.new_error_lookback_hours must be at most {}",
                Self::MAX_LOOKBACK_HOURS
            )));
        }

        if self.store.max_events == 0 {
            return Err(ServiceError::Config(
                "store.max_events must be greater than 0".to_string(),
            ));
        }

        for rule in &self.rules {
            rule.validate().map_err(|e| {
                ServiceError::Config(format!("rule '{}': {e}", rule.name))
            })?;
        }

        let mut ids: Vec<_> = self.rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(ServiceError::Config(format!("duplicate rule id '{}'", pair[0])));
        }

        Ok(())
    }
}

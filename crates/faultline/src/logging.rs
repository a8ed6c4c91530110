//! Tracing subscriber bootstrap.

use std::io;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::{Result, ServiceError};

/// Builds the log filter: `RUST_LOG` when set, else the configured level.
///
/// # Errors
///
/// Returns `ServiceError::Config` if the configured level is not a valid
/// filter directive.
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| ServiceError::Config(format!("invalid log.level '{}': {e}", config.level)))
}

/// Installs the global subscriber. Logs go to stderr.
///
/// # Errors
///
/// Returns `ServiceError::Config` if the filter is invalid or a subscriber
/// is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ServiceError::Config(format!("failed to install logger: {e}")))
}

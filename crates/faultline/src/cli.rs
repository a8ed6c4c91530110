//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use faultline_events::ErrorType;

/// Faultline - error fingerprinting and alerting.
#[derive(Parser, Debug, Clone)]
#[command(name = "faultline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Ingest newline-delimited JSON error events and run alerting on them.
    Ingest {
        /// Path to the TOML config file.
        #[arg(short, long, env = "FAULTLINE_CONFIG")]
        config: Option<PathBuf>,

        /// File with one JSON error event per line.
        input: PathBuf,
    },

    /// Validate a configuration file.
    CheckConfig {
        /// Path to the TOML config file.
        #[arg(short, long, env = "FAULTLINE_CONFIG")]
        config: PathBuf,
    },

    /// Print the fingerprint of an error.
    Fingerprint {
        /// Error type (HTTP, DATABASE, AUTH, ...).
        #[arg(long = "type")]
        error_type: ErrorType,

        /// Error message.
        #[arg(long)]
        message: String,

        /// Request path the error occurred on.
        #[arg(long)]
        endpoint: Option<String>,

        /// File holding the stack trace.
        #[arg(long)]
        stack_trace_file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_ingest() {
        let cli = Cli::parse_from(["faultline", "ingest", "--config", "f.toml", "events.ndjson"]);
        match cli.command {
            Commands::Ingest { config, input } => {
                assert_eq!(config, Some(PathBuf::from("f.toml")));
                assert_eq!(input, PathBuf::from("events.ndjson"));
            }
            other => panic!("expected ingest, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_fingerprint() {
        let cli = Cli::parse_from([
            "faultline",
            "fingerprint",
            "--type",
            "database",
            "--message",
            "timeout",
            "--endpoint",
            "/orders/1",
        ]);
        match cli.command {
            Commands::Fingerprint {
                error_type,
                endpoint,
                stack_trace_file,
                ..
            } => {
                assert_eq!(error_type, ErrorType::Database);
                assert_eq!(endpoint.as_deref(), Some("/orders/1"));
                assert!(stack_trace_file.is_none());
            }
            other => panic!("expected fingerprint, got {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_type() {
        let result = Cli::try_parse_from(["faultline", "fingerprint", "--type", "nope", "--message", "m"]);
        assert!(result.is_err());
    }

    #[test]
    fn cli_requires_config_for_check() {
        if std::env::var_os("FAULTLINE_CONFIG").is_some() {
            return;
        }
        assert!(Cli::try_parse_from(["faultline", "check-config"]).is_err());
    }
}

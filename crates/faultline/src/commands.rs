//! Subcommand implementations.
//!
//! Commands write their human-readable output to the given writer; logs go
//! to stderr through tracing.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use faultline_alerts::{EvaluationResult, Transports};
use faultline_events::fingerprint;
use faultline_events::ErrorType;
use tracing::info;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::pipeline::{IngestReport, Pipeline};

/// Summary of an `ingest` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    /// Accepted and rejected record counts.
    pub report: IngestReport,
    /// Combined alert evaluation results.
    pub alerts: EvaluationResult,
    /// Number of groups after ingestion.
    pub groups: usize,
}

/// Ingests an NDJSON file, waits for alerting and prints a group summary.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the file cannot be
/// read.
pub async fn ingest(
    config: &ServiceConfig,
    transports: Transports,
    input: &Path,
    out: &mut impl Write,
) -> Result<IngestSummary> {
    let pipeline = Pipeline::new(config, transports)?;
    info!(
        input = %input.display(),
        rules = pipeline.active_rule_count(),
        "ingesting error events"
    );

    let file = File::open(input)?;
    let report = pipeline.ingest_ndjson(BufReader::new(file))?;
    let alerts = pipeline.wait_for_alerts().await;
    let groups = pipeline.events().list_groups();

    writeln!(
        out,
        "ingested {} events ({} rejected) into {} groups",
        report.accepted,
        report.rejected,
        groups.len()
    )?;
    writeln!(out)?;
    writeln!(out, "{:<8} {:<9} {:<12} {:<9} PATTERN", "GROUP", "COUNT", "TYPE", "SEVERITY")?;
    for group in &groups {
        writeln!(
            out,
            "{:<8} {:<9} {:<12} {:<9} {}",
            group.id.to_string(),
            group.total_occurrences,
            group.error_type.as_str(),
            group.severity.as_str(),
            group.message_pattern
        )?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "alerts: {} triggered, {} notifications sent, {} failed, {} rules in cooldown, {} rule errors",
        alerts.rules_triggered.len(),
        alerts.notifications_sent,
        alerts.notification_failures,
        alerts.rules_skipped_cooldown,
        alerts.rules_errored
    )?;

    Ok(IngestSummary {
        report,
        alerts,
        groups: groups.len(),
    })
}

/// Loads and validates a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid.
pub fn check_config(path: &Path, out: &mut impl Write) -> Result<ServiceConfig> {
    let config = ServiceConfig::from_file(path)?;
    writeln!(
        out,
        "{}: OK ({} rules, {} active)",
        path.display(),
        config.rules.len(),
        config.rules.iter().filter(|r| r.is_active).count()
    )?;
    Ok(config)
}

/// Prints the fingerprint of an error.
///
/// # Errors
///
/// Returns an error if the stack trace file cannot be read.
pub fn print_fingerprint(
    error_type: ErrorType,
    message: &str,
    endpoint: Option<&str>,
    stack_trace_file: Option<&Path>,
    out: &mut impl Write,
) -> Result<String> {
    let stack_trace = stack_trace_file.map(std::fs::read_to_string).transpose()?;
    let digest = fingerprint(error_type, message, endpoint, stack_trace.as_deref());
    writeln!(out, "{digest}")?;
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn ingest_prints_group_table() {
        let mut input = NamedTempFile::new().unwrap();
        writeln!(
            input,
            r#"{{"message":"user 1 not found","error_type":"DATABASE","severity":"LOW","source":"api"}}"#
        )
        .unwrap();
        writeln!(
            input,
            r#"{{"message":"user 2 not found","error_type":"DATABASE","severity":"HIGH","source":"api"}}"#
        )
        .unwrap();
        writeln!(input, "garbage").unwrap();

        let mut out = Vec::new();
        let summary = ingest(&ServiceConfig::default(), Transports::new(), input.path(), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.report, IngestReport { accepted: 2, rejected: 1 });
        assert_eq!(summary.groups, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("ingested 2 events (1 rejected) into 1 groups"));
        assert!(text.contains("user <N> not found"));
        assert!(text.contains("HIGH"));
    }

    #[tokio::test]
    async fn ingest_missing_file_fails() {
        let mut out = Vec::new();
        let result = ingest(
            &ServiceConfig::default(),
            Transports::new(),
            Path::new("/nonexistent/events.ndjson"),
            &mut out,
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn check_config_reports_rules() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "[[rules]]\nname = \"a\"\ncondition = \"CRITICAL_ERROR\"\n\n[[rules]]\nname = \"b\"\ncondition = \"NEW_ERROR_TYPE\"\nis_active = false\n"
        )
        .unwrap();

        let mut out = Vec::new();
        let config = check_config(file.path(), &mut out).unwrap();

        assert_eq!(config.rules.len(), 2);
        assert!(String::from_utf8(out).unwrap().ends_with("OK (2 rules, 1 active)\n"));
    }

    #[test]
    fn fingerprint_ignores_numeric_tokens() {
        let mut out = Vec::new();
        let a = print_fingerprint(ErrorType::Http, "status 502", Some("/api/7"), None, &mut out).unwrap();
        let b = print_fingerprint(ErrorType::Http, "status 503", Some("/api/8"), None, &mut out).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn fingerprint_reads_stack_trace_file() {
        let mut trace = NamedTempFile::new().unwrap();
        write!(trace, "at handler (app.js line 10)\nat main").unwrap();

        let mut out = Vec::new();
        let with_trace =
            print_fingerprint(ErrorType::Frontend, "boom", None, Some(trace.path()), &mut out).unwrap();
        let without = print_fingerprint(ErrorType::Frontend, "boom", None, None, &mut out).unwrap();

        assert_ne!(with_trace, without);
    }
}

//! Aggregate statistics over stored events.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EventError, Result};
use crate::types::{ErrorEvent, ErrorStatus, ErrorType, Severity};

/// Longest period a statistics query may cover.
pub const MAX_PERIOD_DAYS: u32 = 365;

/// Breakdown of events over a trailing period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Events in the period.
    pub total_errors: u64,
    /// Counts per severity; every severity is present.
    pub by_severity: BTreeMap<Severity, u64>,
    /// Counts per error type; every type is present.
    pub by_type: BTreeMap<ErrorType, u64>,
    /// Counts per source label seen in the period.
    pub by_source: BTreeMap<String, u64>,
    /// Counts per status; every status is present.
    pub by_status: BTreeMap<ErrorStatus, u64>,
    /// Average events per day, rounded to two decimals.
    pub error_rate: f64,
    /// Length of the period in days.
    pub period_days: u32,
}

/// A frequently occurring `(message, type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopError {
    /// Exact message text.
    pub message: String,
    /// Error type.
    pub error_type: ErrorType,
    /// Occurrences in the period.
    pub count: u64,
}

fn period_start(period_days: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if period_days == 0 || period_days > MAX_PERIOD_DAYS {
        return Err(EventError::InvalidQuery {
            reason: format!("period_days must be between 1 and {MAX_PERIOD_DAYS}"),
        });
    }
    Ok(now - Duration::days(i64::from(period_days)))
}

/// Summarises the events of the last `period_days` days.
///
/// # Errors
///
/// Returns `EventError::InvalidQuery` if `period_days` is outside `1..=365`.
pub fn summarize<'a, I>(events: I, period_days: u32, now: DateTime<Utc>) -> Result<StatsSummary>
where
    I: IntoIterator<Item = &'a ErrorEvent>,
{
    let start = period_start(period_days, now)?;

    let mut summary = StatsSummary {
        total_errors: 0,
        by_severity: Severity::ALL.iter().map(|s| (*s, 0)).collect(),
        by_type: ErrorType::ALL.iter().map(|t| (*t, 0)).collect(),
        by_source: BTreeMap::new(),
        by_status: ErrorStatus::ALL.iter().map(|s| (*s, 0)).collect(),
        error_rate: 0.0,
        period_days,
    };

    for event in events.into_iter().filter(|e| e.timestamp >= start) {
        summary.total_errors += 1;
        *summary.by_severity.entry(event.severity).or_default() += 1;
        *summary.by_type.entry(event.error_type).or_default() += 1;
        *summary.by_source.entry(event.source.clone()).or_default() += 1;
        *summary.by_status.entry(event.status).or_default() += 1;
    }

    let per_day = summary.total_errors as f64 / f64::from(period_days);
    summary.error_rate = (per_day * 100.0).round() / 100.0;

    Ok(summary)
}

/// Returns the `limit` most frequent `(message, type)` pairs of the last
/// `period_days` days, most frequent first.
///
/// # Errors
///
/// Returns `EventError::InvalidQuery` if `period_days` is outside `1..=365`.
pub fn top_errors<'a, I>(
    events: I,
    limit: usize,
    period_days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<TopError>>
where
    I: IntoIterator<Item = &'a ErrorEvent>,
{
    let start = period_start(period_days, now)?;

    let mut counts: HashMap<(&str, ErrorType), u64> = HashMap::new();
    for event in events.into_iter().filter(|e| e.timestamp >= start) {
        *counts.entry((event.message.as_str(), event.error_type)).or_default() += 1;
    }

    let mut top: Vec<TopError> = counts
        .into_iter()
        .map(|((message, error_type), count)| TopError {
            message: message.to_string(),
            error_type,
            count,
        })
        .collect();

    // Ties broken by message so the output is stable.
    top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.message.cmp(&b.message)));
    top.truncate(limit);

    Ok(top)
}

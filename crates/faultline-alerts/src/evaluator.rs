//! Condition evaluation.
//!
//! Every history count applies the rule's full filter triple (error type,
//! severity, source). Windows are measured back from the evaluation time
//! `now`, which the caller passes in so evaluation is deterministic.

use chrono::{DateTime, Duration, Utc};
use faultline_events::{ErrorEvent, EventQuery, Severity, TimeRange};
use tracing::debug;

use crate::error::{AlertError, Result};
use crate::manager::EngineConfig;
use crate::types::{
    AlertCondition, AlertRule, ErrorCountParams, ErrorRateParams, ErrorSpikeParams,
};

/// Evaluates a rule's condition for a triggering event.
///
/// Does not check applicability or cooldown; callers do that first.
///
/// # Errors
///
/// Returns `AlertError::InvalidConditionParams` for unusable parameters and
/// `AlertError::Store` if a history query fails.
pub fn evaluate<Q>(
    rule: &AlertRule,
    event: &ErrorEvent,
    history: &Q,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<bool>
where
    Q: EventQuery + ?Sized,
{
    let triggered = match rule.resolve_condition()? {
        AlertCondition::CriticalError => event.severity == Severity::Critical,
        AlertCondition::ErrorCount(params) => error_count(rule, history, now, params)?,
        AlertCondition::ErrorRate(params) => error_rate(rule, history, now, params, config)?,
        AlertCondition::NewErrorType => new_error_type(event, history, now, config)?,
        AlertCondition::ErrorSpike(params) => error_spike(rule, history, now, params, config)?,
    };

    debug!(
        rule_id = %rule.id,
        condition = %rule.condition,
        triggered,
        "evaluated condition"
    );
    Ok(triggered)
}

fn minutes(m: u32) -> Duration {
    Duration::minutes(i64::from(m))
}

/// Returns `now - window`, failing instead of overflowing the calendar.
fn window_start(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    now.checked_sub_signed(window)
        .ok_or_else(|| AlertError::EvaluationError {
            reason: format!("window of {} minutes reaches past the earliest timestamp", window.num_minutes()),
        })
}

fn count_since<Q>(rule: &AlertRule, history: &Q, start: DateTime<Utc>) -> Result<u64>
where
    Q: EventQuery + ?Sized,
{
    Ok(history.count_events(&rule.history_filter(TimeRange::since(start)))?)
}

fn error_count<Q>(
    rule: &AlertRule,
    history: &Q,
    now: DateTime<Utc>,
    params: ErrorCountParams,
) -> Result<bool>
where
    Q: EventQuery + ?Sized,
{
    let start = window_start(now, minutes(params.time_window_minutes))?;
    let count = count_since(rule, history, start)?;
    Ok(count >= params.threshold)
}

fn error_rate<Q>(
    rule: &AlertRule,
    history: &Q,
    now: DateTime<Utc>,
    params: ErrorRateParams,
    config: &EngineConfig,
) -> Result<bool>
where
    Q: EventQuery + ?Sized,
{
    let start = window_start(now, minutes(params.time_window_minutes))?;
    let count = count_since(rule, history, start)?;
    if count < config.min_errors_for_rate {
        return Ok(false);
    }
    // The denominator is the configured volume, not measured traffic.
    let rate = count as f64 / params.min_requests as f64 * 100.0;
    Ok(rate >= params.threshold_percent)
}

fn new_error_type<Q>(
    event: &ErrorEvent,
    history: &Q,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<bool>
where
    Q: EventQuery + ?Sized,
{
    let lookback = Duration::try_hours(i64::from(config.new_error_lookback_hours)).ok_or_else(|| {
        AlertError::EvaluationError {
            reason: format!("lookback of {} hours is out of range", config.new_error_lookback_hours),
        }
    })?;
    let range = TimeRange::between(window_start(now, lookback)?, event.timestamp);
    let prior = history.count_similar(event.error_type, &event.message, &range)?;
    Ok(prior == 0)
}

fn error_spike<Q>(
    rule: &AlertRule,
    history: &Q,
    now: DateTime<Utc>,
    params: ErrorSpikeParams,
    config: &EngineConfig,
) -> Result<bool>
where
    Q: EventQuery + ?Sized,
{
    let recent_start = window_start(now, minutes(params.time_window_minutes))?;
    let baseline_start = window_start(now, minutes(params.comparison_window_minutes))?;

    let recent = count_since(rule, history, recent_start)?;
    let baseline = history.count_events(
        &rule.history_filter(TimeRange::between(baseline_start, recent_start)),
    )?;

    let normalized = baseline as f64 * f64::from(params.time_window_minutes)
        / f64::from(params.comparison_window_minutes);

    if normalized == 0.0 {
        return Ok(recent >= config.spike_min_recent);
    }
    Ok(recent as f64 >= normalized * params.spike_multiplier)
}

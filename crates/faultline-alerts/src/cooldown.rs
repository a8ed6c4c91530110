//! Per-rule trigger cooldown.
//!
//! A rule that fired at `last_triggered` may not fire again until
//! `last_triggered + cooldown_minutes`. The cooldown is global to the rule,
//! so while it runs the rule is skipped for every event regardless of group.
//! Advancing `last_triggered` is done through the rule store's
//! compare-and-set so two concurrent evaluations cannot both claim a window.

use chrono::{DateTime, Duration, Utc};

use crate::types::AlertRule;

/// Returns when the rule's current cooldown ends, if one is running.
#[must_use]
pub fn cooldown_ends_at(rule: &AlertRule) -> Option<DateTime<Utc>> {
    rule.last_triggered
        .map(|at| at + Duration::minutes(i64::from(rule.cooldown_minutes)))
}

/// Returns true if the rule may fire at `now`.
#[must_use]
pub fn is_eligible(rule: &AlertRule, now: DateTime<Utc>) -> bool {
    cooldown_ends_at(rule).is_none_or(|ends| now >= ends)
}

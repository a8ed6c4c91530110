//! Rule and notification-log storage.
//!
//! [`RuleStore`] is the persistence seam of the alerting side. The
//! cooldown state lives on the persisted rule and is advanced with an
//! atomic compare-and-set, so concurrent evaluations of one rule claim a
//! cooldown window at most once.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use crate::error::{AlertError, Result};
use crate::types::{AlertRule, NotificationLog};

/// Persistence surface for alert rules and notification logs.
pub trait RuleStore: Send + Sync {
    /// Returns every active rule.
    fn list_active_rules(&self) -> Result<Vec<AlertRule>>;

    /// Gets a rule by ID.
    fn get_rule(&self, id: &str) -> Option<AlertRule>;

    /// Adds a rule after validating it.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidRule` if the rule is invalid or its ID is
    /// already taken.
    fn insert_rule(&self, rule: AlertRule) -> Result<()>;

    /// Replaces an existing rule.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::RuleNotFound` if no rule has this ID.
    fn update_rule(&self, rule: AlertRule) -> Result<()>;

    /// Removes a rule. Returns true if it existed.
    fn remove_rule(&self, id: &str) -> bool;

    /// Sets `last_triggered` to `new` only if it still equals `expected`.
    ///
    /// Returns false if another writer changed it first.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::RuleNotFound` if no rule has this ID.
    fn compare_and_set_last_triggered(
        &self,
        id: &str,
        expected: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    ) -> Result<bool>;

    /// Appends a notification log record.
    fn append_notification_log(&self, log: NotificationLog) -> Result<()>;

    /// Returns the notification logs of one rule, oldest first.
    fn notification_logs(&self, rule_id: &str) -> Vec<NotificationLog>;
}

/// In-memory [`RuleStore`].
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<String, AlertRule>>,
    logs: RwLock<Vec<NotificationLog>>,
}

impl MemoryRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with rules.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails [`RuleStore::insert_rule`].
    pub fn with_rules(rules: impl IntoIterator<Item = AlertRule>) -> Result<Self> {
        let store = Self::new();
        for rule in rules {
            store.insert_rule(rule)?;
        }
        Ok(store)
    }

    /// Returns every rule.
    #[must_use]
    pub fn list_rules(&self) -> Vec<AlertRule> {
        self.rules.read().values().cloned().collect()
    }

    /// Returns every notification log, oldest first.
    #[must_use]
    pub fn all_notification_logs(&self) -> Vec<NotificationLog> {
        self.logs.read().clone()
    }
}

impl RuleStore for MemoryRuleStore {
    fn list_active_rules(&self) -> Result<Vec<AlertRule>> {
        let rules = self.rules.read();
        let mut active: Vec<_> = rules.values().filter(|r| r.is_active).cloned().collect();
        active.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(active)
    }

    fn get_rule(&self, id: &str) -> Option<AlertRule> {
        self.rules.read().get(id).cloned()
    }

    fn insert_rule(&self, rule: AlertRule) -> Result<()> {
        rule.validate()?;
        let mut rules = self.rules.write();

        if rules.contains_key(&rule.id) {
            return Err(AlertError::InvalidRule {
                reason: format!("rule with ID '{}' already exists", rule.id),
            });
        }

        info!(rule_id = %rule.id, rule_name = %rule.name, "added alert rule");
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn update_rule(&self, rule: AlertRule) -> Result<()> {
        rule.validate()?;
        let mut rules = self.rules.write();

        if !rules.contains_key(&rule.id) {
            return Err(AlertError::RuleNotFound { id: rule.id });
        }

        info!(rule_id = %rule.id, rule_name = %rule.name, "updated alert rule");
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    fn remove_rule(&self, id: &str) -> bool {
        let removed = self.rules.write().remove(id).is_some();
        if removed {
            info!(rule_id = %id, "removed alert rule");
        }
        removed
    }

    fn compare_and_set_last_triggered(
        &self,
        id: &str,
        expected: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    ) -> Result<bool> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(id)
            .ok_or_else(|| AlertError::RuleNotFound { id: id.to_string() })?;

        if rule.last_triggered != expected {
            return Ok(false);
        }
        rule.last_triggered = Some(new);
        Ok(true)
    }

    fn append_notification_log(&self, log: NotificationLog) -> Result<()> {
        self.logs.write().push(log);
        Ok(())
    }

    fn notification_logs(&self, rule_id: &str) -> Vec<NotificationLog> {
        self.logs
            .read()
            .iter()
            .filter(|l| l.rule_id == rule_id)
            .cloned()
            .collect()
    }
}

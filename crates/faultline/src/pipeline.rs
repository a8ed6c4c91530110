//! Ingestion pipeline.
//!
//! Each incoming event is validated, fingerprinted, folded into its group
//! and stored. Alert evaluation for the stored event is then spawned on the
//! runtime, so ingestion never waits for rule evaluation or delivery.

use std::io::BufRead;
use std::sync::Arc;

use chrono::Utc;
use faultline_alerts::{AlertEngine, EvaluationResult, MemoryRuleStore, RuleStore, Transports};
use faultline_events::fingerprint::normalize_message;
use faultline_events::{
    fingerprint, upsert_group, ErrorEvent, EventStore, GroupCandidate, MemoryEventStore,
    NewErrorEvent,
};
use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};

/// Outcome of ingesting a batch of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Events stored.
    pub accepted: usize,
    /// Records that could not be parsed or stored.
    pub rejected: usize,
}

/// Scheduled evaluations plus the summed results of those already reaped.
#[derive(Debug, Default)]
struct PendingEvaluations {
    handles: Vec<JoinHandle<EvaluationResult>>,
    settled: EvaluationResult,
}

impl PendingEvaluations {
    /// Folds finished handles into `settled` so the list only holds
    /// evaluations still running.
    fn reap_finished(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.handles.drain(..).partition(JoinHandle::is_finished);
        self.handles = running;
        for handle in finished {
            if let Some(joined) = handle.now_or_never() {
                merge(&mut self.settled, joined);
            }
        }
    }
}

fn merge(total: &mut EvaluationResult, joined: std::result::Result<EvaluationResult, JoinError>) {
    match joined {
        Ok(result) => {
            total.rules_evaluated += result.rules_evaluated;
            total.rules_skipped_cooldown += result.rules_skipped_cooldown;
            total.rules_errored += result.rules_errored;
            total.rules_triggered.extend(result.rules_triggered);
            total.notifications_sent += result.notifications_sent;
            total.notification_failures += result.notification_failures;
        }
        Err(e) => warn!(error = %e, "alert evaluation task failed"),
    }
}

/// The ingest-then-alert pipeline over in-memory stores.
#[derive(Debug)]
pub struct Pipeline {
    events: Arc<MemoryEventStore>,
    rules: Arc<MemoryRuleStore>,
    engine: AlertEngine,
    pending: Mutex<PendingEvaluations>,
}

impl Pipeline {
    /// Builds a pipeline from configuration, seeding the configured rules.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Alerts` if a configured rule is rejected.
    pub fn new(config: &ServiceConfig, transports: Transports) -> Result<Self> {
        let events = Arc::new(MemoryEventStore::with_config(config.store.to_store_config()));
        let rules = Arc::new(MemoryRuleStore::with_rules(config.rules.iter().cloned())?);
        let engine = AlertEngine::with_config(
            events.clone(),
            rules.clone(),
            transports,
            config.alerts.clone(),
        );

        Ok(Self {
            events,
            rules,
            engine,
            pending: Mutex::new(PendingEvaluations::default()),
        })
    }

    /// Returns the event store.
    #[must_use]
    pub const fn events(&self) -> &Arc<MemoryEventStore> {
        &self.events
    }

    /// Returns the rule store.
    #[must_use]
    pub const fn rules(&self) -> &Arc<MemoryRuleStore> {
        &self.rules
    }

    /// Stores one event and schedules its alert evaluation.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Events` if the event is invalid or the store
    /// rejects it.
    pub fn ingest(&self, event: NewErrorEvent) -> Result<ErrorEvent> {
        event.validate()?;

        let candidate = GroupCandidate {
            fingerprint: fingerprint(
                event.error_type,
                &event.message,
                event.endpoint.as_deref(),
                event.stack_trace.as_deref(),
            ),
            error_type: event.error_type,
            severity: event.severity,
            source: event.source.clone(),
            message_pattern: normalize_message(&event.message),
        };
        let group = upsert_group(self.events.as_ref(), candidate, Utc::now())?;
        let stored = self.events.append(event, Some(group.id))?;

        debug!(
            event_id = %stored.id,
            group_id = %group.id,
            occurrences = group.total_occurrences,
            "stored error event"
        );

        let handle = self.engine.spawn_evaluation(stored.clone());
        let mut pending = self.pending.lock();
        pending.reap_finished();
        pending.handles.push(handle);
        Ok(stored)
    }

    /// Ingests newline-delimited JSON events. Blank lines are skipped; bad
    /// records are logged and counted as rejected.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Io` if the reader fails.
    pub fn ingest_ndjson(&self, reader: impl BufRead) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let stored = serde_json::from_str::<NewErrorEvent>(&line)
                .map_err(|e| ServiceError::InvalidInput {
                    line: index + 1,
                    reason: e.to_string(),
                })
                .and_then(|event| self.ingest(event));

            match stored {
                Ok(_) => report.accepted += 1,
                Err(e) => {
                    report.rejected += 1;
                    warn!(line = index + 1, error = %e, "rejected error event");
                }
            }
        }

        Ok(report)
    }

    /// Waits for every evaluation scheduled since the last call and sums
    /// their results.
    pub async fn wait_for_alerts(&self) -> EvaluationResult {
        let PendingEvaluations {
            handles,
            mut settled,
        } = std::mem::take(&mut *self.pending.lock());

        for joined in join_all(handles).await {
            merge(&mut settled, joined);
        }

        settled
    }

    /// Returns the number of evaluations that were still running when last
    /// checked.
    #[must_use]
    pub fn pending_evaluations(&self) -> usize {
        self.pending.lock().handles.len()
    }

    /// Returns the number of active rules.
    #[must_use]
    pub fn active_rule_count(&self) -> usize {
        self.rules.list_active_rules().map_or(0, |r| r.len())
    }
}

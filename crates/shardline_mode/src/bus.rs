//! Rule event bus: handler table keyed by event type.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use shardline_common::error::{MetaDataError, ShardlineError};
use shardline_metadata::RuleChange;
use shardline_observability::record_rule_event;

use crate::event::{RuleChangedEvent, RuleEventType};
use crate::subscriber::RuleChangedSubscriber;

/// Delivers each event to the subscribers registered for its type.
///
/// Handler failures are logged and counted, never returned: one bad event
/// must not stall delivery of the ones behind it.
#[derive(Default)]
pub struct RuleEventBus {
    handlers: RwLock<BTreeMap<RuleEventType, Vec<Arc<dyn RuleChangedSubscriber>>>>,
}

/// What happened to one event at one subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Applied(RuleChange),
    /// Stale or duplicate version.
    Skipped,
    /// Target database is not registered.
    UnknownDatabase,
    /// The rule itself is invalid (bad definition, unknown storage unit).
    Rejected,
    Failed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Applied(change) => change.as_str(),
            DeliveryOutcome::Skipped => "skipped",
            DeliveryOutcome::UnknownDatabase => "unknown_database",
            DeliveryOutcome::Rejected => "rejected",
            DeliveryOutcome::Failed => "failed",
        }
    }
}

impl RuleEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `subscriber` to the handler table for each type it declares.
    pub fn register(&self, subscriber: Arc<dyn RuleChangedSubscriber>) {
        let mut handlers = self.handlers.write();
        for event_type in subscriber.event_types() {
            handlers
                .entry(*event_type)
                .or_default()
                .push(Arc::clone(&subscriber));
        }
        tracing::debug!(subscriber = subscriber.name(), "subscriber registered");
    }

    pub fn handler_count(&self, event_type: RuleEventType) -> usize {
        self.handlers.read().get(&event_type).map_or(0, Vec::len)
    }

    /// Deliver `event` synchronously to every handler of its type.
    pub fn post(&self, event: &RuleChangedEvent) -> Vec<DeliveryOutcome> {
        let event_type = event.event_type();
        // Clone the handler list so no bus lock is held while handlers run.
        let targets: Vec<Arc<dyn RuleChangedSubscriber>> = self
            .handlers
            .read()
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        if targets.is_empty() {
            tracing::warn!(event_type = %event_type, database = %event.database(), "no handler for rule event");
            record_rule_event(event_type.as_str(), "unhandled");
            return Vec::new();
        }

        targets
            .iter()
            .map(|subscriber| {
                let outcome = classify(subscriber.handle(event));
                log_outcome(subscriber.name(), event, outcome);
                record_rule_event(event_type.as_str(), outcome.as_str());
                outcome
            })
            .collect()
    }
}

fn classify(result: Result<RuleChange, ShardlineError>) -> DeliveryOutcome {
    match result {
        Ok(change) => DeliveryOutcome::Applied(change),
        Err(ShardlineError::MetaData(MetaDataError::StaleVersion { .. })) => DeliveryOutcome::Skipped,
        Err(ShardlineError::MetaData(MetaDataError::DatabaseNotFound(_))) => {
            DeliveryOutcome::UnknownDatabase
        }
        Err(ShardlineError::MetaData(
            MetaDataError::UnknownStorageUnit { .. } | MetaDataError::InvalidRule { .. },
        )) => DeliveryOutcome::Rejected,
        Err(_) => DeliveryOutcome::Failed,
    }
}

fn log_outcome(subscriber: &'static str, event: &RuleChangedEvent, outcome: DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Applied(change) => tracing::info!(
            subscriber,
            event_type = %event.event_type(),
            database = %event.database(),
            rule = %event.rule_name(),
            version = event.version(),
            change = change.as_str(),
            "rule event applied"
        ),
        DeliveryOutcome::Failed => tracing::error!(
            subscriber,
            event_type = %event.event_type(),
            database = %event.database(),
            rule = %event.rule_name(),
            version = event.version(),
            "rule event failed"
        ),
        other => tracing::warn!(
            subscriber,
            event_type = %event.event_type(),
            database = %event.database(),
            rule = %event.rule_name(),
            version = event.version(),
            outcome = other.as_str(),
            "rule event not applied"
        ),
    }
}

use std::sync::Arc;

use shardline_common::error::{ShardlineError, ShardlineResult};
use shardline_metadata::{MetaDataStore, RuleChange};

use super::{RuleChangedSubscriber, SubscriberSlot};
use crate::context_manager::ContextManager;
use crate::event::{AlterRuleEvent, DropRuleEvent, RuleChangedEvent, RuleEventType};

#[derive(Clone)]
pub struct ShardingBroadcastTableSubscribeEngine {
    store: Arc<MetaDataStore>,
}

impl ShardingBroadcastTableSubscribeEngine {
    pub fn new(store: Arc<MetaDataStore>) -> Self {
        Self { store }
    }

    pub fn renew_alter(&self, event: &AlterRuleEvent<String>) -> ShardlineResult<RuleChange> {
        self.store.alter_database(&event.database, |db| {
            db.alter_broadcast_table(&event.rule, event.version)
        })
    }

    pub fn renew_drop(&self, event: &DropRuleEvent) -> ShardlineResult<RuleChange> {
        self.store.alter_database(&event.database, |db| {
            db.drop_broadcast_table(&event.rule_name, event.version)
        })
    }
}

/// Broadcast-table rule family. Holds its own lock, independent of the
/// auto table subscriber.
pub struct ShardingBroadcastTableSubscriber {
    slot: SubscriberSlot<ShardingBroadcastTableSubscribeEngine>,
}

impl Default for ShardingBroadcastTableSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardingBroadcastTableSubscriber {
    pub fn new() -> Self {
        Self {
            slot: SubscriberSlot::new("sharding_broadcast_table"),
        }
    }

    pub fn on_alter(&self, event: &AlterRuleEvent<String>) -> ShardlineResult<RuleChange> {
        self.slot.with_engine(|engine| engine.renew_alter(event))
    }

    pub fn on_drop(&self, event: &DropRuleEvent) -> ShardlineResult<RuleChange> {
        self.slot.with_engine(|engine| engine.renew_drop(event))
    }
}

impl RuleChangedSubscriber for ShardingBroadcastTableSubscriber {
    fn name(&self) -> &'static str {
        "sharding_broadcast_table"
    }

    fn event_types(&self) -> &'static [RuleEventType] {
        &[RuleEventType::AlterBroadcastTable, RuleEventType::DropBroadcastTable]
    }

    fn set_context_manager(&self, manager: &ContextManager) {
        self.slot.bind(ShardingBroadcastTableSubscribeEngine::new(Arc::clone(
            manager.metadata_store(),
        )));
    }

    fn unbind(&self) {
        self.slot.unbind();
    }

    fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    fn handle(&self, event: &RuleChangedEvent) -> ShardlineResult<RuleChange> {
        match event {
            RuleChangedEvent::AlterBroadcastTable(e) => self.on_alter(e),
            RuleChangedEvent::DropBroadcastTable(e) => self.on_drop(e),
            other => Err(ShardlineError::internal_bug(
                "E-MODE-002",
                format!("{} routed to {}", other.event_type(), self.name()),
            )),
        }
    }
}

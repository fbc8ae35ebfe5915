use std::sync::Arc;

use shardline_common::config::ShardingAutoTableRuleConfiguration;
use shardline_common::error::{ShardlineError, ShardlineResult};
use shardline_metadata::{MetaDataStore, RuleChange};

use super::{RuleChangedSubscriber, SubscriberSlot};
use crate::context_manager::ContextManager;
use crate::event::{AlterRuleEvent, DropRuleEvent, RuleChangedEvent, RuleEventType};

/// Applies auto table rule changes to the metadata store.
#[derive(Clone)]
pub struct ShardingAutoTableSubscribeEngine {
    store: Arc<MetaDataStore>,
}

impl ShardingAutoTableSubscribeEngine {
    pub fn new(store: Arc<MetaDataStore>) -> Self {
        Self { store }
    }

    pub fn renew_alter(
        &self,
        event: &AlterRuleEvent<ShardingAutoTableRuleConfiguration>,
    ) -> ShardlineResult<RuleChange> {
        self.store.alter_database(&event.database, |db| {
            db.alter_auto_table(event.rule.clone(), event.version)
        })
    }

    pub fn renew_drop(&self, event: &DropRuleEvent) -> ShardlineResult<RuleChange> {
        self.store.alter_database(&event.database, |db| {
            db.drop_auto_table(&event.rule_name, event.version)
        })
    }
}

pub struct ShardingAutoTableSubscriber {
    slot: SubscriberSlot<ShardingAutoTableSubscribeEngine>,
}

impl Default for ShardingAutoTableSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardingAutoTableSubscriber {
    pub fn new() -> Self {
        Self {
            slot: SubscriberSlot::new("sharding_auto_table"),
        }
    }

    pub fn on_alter(
        &self,
        event: &AlterRuleEvent<ShardingAutoTableRuleConfiguration>,
    ) -> ShardlineResult<RuleChange> {
        self.slot.with_engine(|engine| engine.renew_alter(event))
    }

    pub fn on_drop(&self, event: &DropRuleEvent) -> ShardlineResult<RuleChange> {
        self.slot.with_engine(|engine| engine.renew_drop(event))
    }
}

impl RuleChangedSubscriber for ShardingAutoTableSubscriber {
    fn name(&self) -> &'static str {
        "sharding_auto_table"
    }

    fn event_types(&self) -> &'static [RuleEventType] {
        &[RuleEventType::AlterAutoTable, RuleEventType::DropAutoTable]
    }

    fn set_context_manager(&self, manager: &ContextManager) {
        self.slot
            .bind(ShardingAutoTableSubscribeEngine::new(Arc::clone(manager.metadata_store())));
    }

    fn unbind(&self) {
        self.slot.unbind();
    }

    fn is_bound(&self) -> bool {
        self.slot.is_bound()
    }

    fn handle(&self, event: &RuleChangedEvent) -> ShardlineResult<RuleChange> {
        match event {
            RuleChangedEvent::AlterAutoTable(e) => self.on_alter(e),
            RuleChangedEvent::DropAutoTable(e) => self.on_drop(e),
            other => Err(ShardlineError::internal_bug(
                "E-MODE-001",
                format!("{} routed to {}", other.event_type(), self.name()),
            )),
        }
    }
}

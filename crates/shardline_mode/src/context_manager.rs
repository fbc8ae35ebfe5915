//! Context manager: owns the metadata store and the rule-change pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shardline_common::config::ShardlineConfig;
use shardline_common::error::ShardlineResult;
use shardline_metadata::MetaDataStore;

use crate::bus::{DeliveryOutcome, RuleEventBus};
use crate::dispatcher::RuleEventDispatcher;
use crate::event::RuleChangedEvent;
use crate::subscriber::{
    RuleChangedSubscriber, ShardingAutoTableSubscriber, ShardingBroadcastTableSubscriber,
};

/// Attach builds the store and binds every subscriber to it; `close`
/// drains pending events, unbinds the subscribers and closes the store.
pub struct ContextManager {
    store: Arc<MetaDataStore>,
    bus: Arc<RuleEventBus>,
    dispatcher: RuleEventDispatcher,
    subscribers: Vec<Arc<dyn RuleChangedSubscriber>>,
    closed: AtomicBool,
}

impl ContextManager {
    pub fn from_config(config: &ShardlineConfig) -> ShardlineResult<Self> {
        config.validate()?;
        let store = Arc::new(MetaDataStore::from_config(&config.databases)?);
        let manager = Self::attach(store, config.event_bus.channel_capacity)?;
        tracing::info!(
            databases = config.databases.len(),
            channel_capacity = config.event_bus.channel_capacity,
            "context manager attached"
        );
        Ok(manager)
    }

    /// Attach to an existing store with the default subscriber set.
    pub fn attach(store: Arc<MetaDataStore>, channel_capacity: usize) -> ShardlineResult<Self> {
        let bus = Arc::new(RuleEventBus::new());
        let dispatcher = RuleEventDispatcher::start(Arc::clone(&bus), channel_capacity)?;
        let subscribers: Vec<Arc<dyn RuleChangedSubscriber>> = vec![
            Arc::new(ShardingAutoTableSubscriber::new()),
            Arc::new(ShardingBroadcastTableSubscriber::new()),
        ];
        let manager = Self {
            store,
            bus,
            dispatcher,
            subscribers,
            closed: AtomicBool::new(false),
        };
        for subscriber in &manager.subscribers {
            subscriber.set_context_manager(&manager);
            manager.bus.register(Arc::clone(subscriber));
        }
        Ok(manager)
    }

    pub fn metadata_store(&self) -> &Arc<MetaDataStore> {
        &self.store
    }

    pub fn event_bus(&self) -> &Arc<RuleEventBus> {
        &self.bus
    }

    pub fn dispatcher(&self) -> &RuleEventDispatcher {
        &self.dispatcher
    }

    pub fn subscribers(&self) -> &[Arc<dyn RuleChangedSubscriber>] {
        &self.subscribers
    }

    /// Queue an event for asynchronous application.
    pub fn publish(&self, event: RuleChangedEvent) -> ShardlineResult<()> {
        self.dispatcher.publish(event)
    }

    /// Apply an event on the calling thread.
    pub fn apply(&self, event: &RuleChangedEvent) -> Vec<DeliveryOutcome> {
        self.bus.post(event)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.dispatcher.shutdown();
        for subscriber in &self.subscribers {
            subscriber.unbind();
        }
        self.store.close();
        tracing::info!("context manager closed");
    }
}

impl Drop for ContextManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardline_common::config::ShardingAutoTableRuleConfiguration;
    use shardline_metadata::RuleChange;

    const CONFIG: &str = r#"
[event_bus]
channel_capacity = 8

[[databases]]
name = "sharding_db"
storage_units = [{ name = "ds_0" }, { name = "ds_1" }]
"#;

    fn manager() -> ContextManager {
        ContextManager::from_config(&ShardlineConfig::from_toml_str(CONFIG).unwrap()).unwrap()
    }

    fn order_rule(units: &[&str]) -> ShardingAutoTableRuleConfiguration {
        ShardingAutoTableRuleConfiguration {
            logic_table: "t_order".into(),
            storage_units: units.iter().map(|u| u.to_string()).collect(),
            sharding_column: "order_id".into(),
            sharding_count: 4,
        }
    }

    #[test]
    fn test_attach_binds_subscribers() {
        let manager = manager();
        assert!(manager.subscribers().iter().all(|s| s.is_bound()));
        assert!(manager.metadata_store().database("SHARDING_DB").is_some());
    }

    #[test]
    fn test_apply_alter_and_tolerated_failures() {
        let manager = manager();
        let outcomes = manager.apply(&RuleChangedEvent::alter_auto_table("sharding_db", 1, order_rule(&["ds_0"])));
        assert_eq!(outcomes, vec![DeliveryOutcome::Applied(RuleChange::Created)]);

        let outcomes = manager.apply(&RuleChangedEvent::alter_auto_table("sharding_db", 1, order_rule(&["ds_1"])));
        assert_eq!(outcomes, vec![DeliveryOutcome::Skipped]);

        let outcomes = manager.apply(&RuleChangedEvent::alter_auto_table("sharding_db", 2, order_rule(&["ds_9"])));
        assert_eq!(outcomes, vec![DeliveryOutcome::Rejected]);

        let outcomes = manager.apply(&RuleChangedEvent::drop_auto_table("other_db", 3, "t_order"));
        assert_eq!(outcomes, vec![DeliveryOutcome::UnknownDatabase]);

        let db = manager.metadata_store().database("sharding_db").unwrap();
        assert_eq!(db.rules().auto_table("t_order").unwrap().config().storage_units, vec!["ds_0".to_string()]);
    }

    #[test]
    fn test_publish_is_applied_by_drain_thread() {
        let manager = manager();
        manager
            .publish(RuleChangedEvent::alter_broadcast_table("sharding_db", 1, "t_dict"))
            .unwrap();
        manager.dispatcher().shutdown();
        assert_eq!(manager.dispatcher().delivered(), 1);
        let db = manager.metadata_store().database("sharding_db").unwrap();
        assert!(db.rules().is_broadcast_table("t_dict"));
    }

    #[test]
    fn test_close_detaches() {
        let manager = manager();
        let held = manager.metadata_store().snapshot();
        manager.close();
        assert!(manager.is_closed());
        assert!(manager.subscribers().iter().all(|s| !s.is_bound()));
        assert!(manager.metadata_store().is_closed());
        assert!(held.database("sharding_db").is_some());
        assert!(manager.publish(RuleChangedEvent::drop_auto_table("sharding_db", 1, "t")).is_err());
    }
}

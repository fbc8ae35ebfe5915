//! Cluster mode: the context manager and the rule-change synchronization
//! pipeline that feeds the metadata store.

pub mod bus;
pub mod context_manager;
pub mod dispatcher;
pub mod event;
pub mod subscriber;

pub use bus::{DeliveryOutcome, RuleEventBus};
pub use context_manager::ContextManager;
pub use dispatcher::RuleEventDispatcher;
pub use event::{AlterRuleEvent, DropRuleEvent, RuleChangedEvent, RuleEventType};
pub use subscriber::{
    RuleChangedSubscriber, ShardingAutoTableSubscribeEngine, ShardingAutoTableSubscriber,
    ShardingBroadcastTableSubscribeEngine, ShardingBroadcastTableSubscriber,
};

//! Rule-change subscribers.
//!
//! One subscriber per rule family. Each owns a subscribe engine bound to the
//! context manager's metadata store and applies its family's alter/drop
//! events one at a time under its own mutex. Different families never wait
//! on each other's lock; the store's writer lock keeps their publishes from
//! losing updates.

mod auto_table;
mod broadcast_table;

pub use auto_table::{ShardingAutoTableSubscribeEngine, ShardingAutoTableSubscriber};
pub use broadcast_table::{ShardingBroadcastTableSubscribeEngine, ShardingBroadcastTableSubscriber};

use parking_lot::Mutex;

use shardline_common::error::{MetaDataError, ShardlineResult};
use shardline_metadata::RuleChange;

use crate::context_manager::ContextManager;
use crate::event::{RuleChangedEvent, RuleEventType};

pub trait RuleChangedSubscriber: Send + Sync {
    fn name(&self) -> &'static str;

    /// Event types this subscriber handles; used to fill the handler table.
    fn event_types(&self) -> &'static [RuleEventType];

    /// Bind to a context manager, replacing any previous binding.
    fn set_context_manager(&self, manager: &ContextManager);

    /// Return to the unbound state.
    fn unbind(&self);

    fn is_bound(&self) -> bool;

    /// Apply one event. Serialized with every other event of this subscriber.
    fn handle(&self, event: &RuleChangedEvent) -> ShardlineResult<RuleChange>;
}

/// Subscriber lifecycle. Binding goes straight to `Active`.
#[derive(Debug)]
pub(crate) enum SubscriberState<E> {
    Uninitialized,
    Active(E),
}

/// Engine slot guarded by the per-subscriber mutex.
#[derive(Debug)]
pub(crate) struct SubscriberSlot<E> {
    name: &'static str,
    state: Mutex<SubscriberState<E>>,
}

impl<E> SubscriberSlot<E> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(SubscriberState::Uninitialized),
        }
    }

    pub(crate) fn bind(&self, engine: E) {
        *self.state.lock() = SubscriberState::Active(engine);
        tracing::debug!(subscriber = self.name, "subscriber bound");
    }

    pub(crate) fn unbind(&self) {
        *self.state.lock() = SubscriberState::Uninitialized;
    }

    pub(crate) fn is_bound(&self) -> bool {
        matches!(*self.state.lock(), SubscriberState::Active(_))
    }

    /// Run `f` against the engine while holding the subscriber lock.
    pub(crate) fn with_engine<T>(&self, f: impl FnOnce(&E) -> ShardlineResult<T>) -> ShardlineResult<T> {
        let state = self.state.lock();
        match &*state {
            SubscriberState::Active(engine) => f(engine),
            SubscriberState::Uninitialized => Err(MetaDataError::NotBound(self.name.to_string()).into()),
        }
    }
}

//! Channel-fed rule event dispatcher.
//!
//! `publish()` enqueues onto a bounded `std::sync::mpsc` channel without
//! blocking. A single named drain thread posts events to the bus in publish
//! order, so subscriber handlers never run on the publisher's thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use shardline_common::error::{ShardlineError, ShardlineResult};

use crate::bus::RuleEventBus;
use crate::event::RuleChangedEvent;

pub struct RuleEventDispatcher {
    tx: Mutex<Option<SyncSender<RuleChangedEvent>>>,
    drain_thread: Mutex<Option<JoinHandle<()>>>,
    /// Events posted to the bus by the drain thread.
    delivered: Arc<AtomicU64>,
    /// Events refused because the channel was full.
    dropped: AtomicU64,
}

impl RuleEventDispatcher {
    pub fn start(bus: Arc<RuleEventBus>, capacity: usize) -> ShardlineResult<Self> {
        let (tx, rx) = mpsc::sync_channel::<RuleChangedEvent>(capacity.max(1));
        let delivered = Arc::new(AtomicU64::new(0));
        let delivered_clone = Arc::clone(&delivered);

        let drain_thread = std::thread::Builder::new()
            .name("shardline-rule-events".into())
            .spawn(move || {
                for event in rx {
                    bus.post(&event);
                    delivered_clone.fetch_add(1, Ordering::Release);
                }
                tracing::debug!("rule event drain thread exiting");
            })
            .map_err(|e| ShardlineError::Transient(format!("failed to spawn rule event thread: {}", e)))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            drain_thread: Mutex::new(Some(drain_thread)),
            delivered,
            dropped: AtomicU64::new(0),
        })
    }

    /// Enqueue an event. Fails only when the channel is full or closed.
    pub fn publish(&self, event: RuleChangedEvent) -> ShardlineResult<()> {
        let tx = self.tx.lock();
        let Some(sender) = tx.as_ref() else {
            return Err(ShardlineError::Transient("rule event dispatcher is shut down".into()));
        };
        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    event_type = %event.event_type(),
                    database = %event.database(),
                    "rule event channel full"
                );
                Err(ShardlineError::Transient("rule event channel is full".into()))
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(ShardlineError::Transient("rule event channel is closed".into()))
            }
        }
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.tx.lock().is_some()
    }

    /// Close the channel and wait for queued events to drain. Idempotent.
    pub fn shutdown(&self) {
        drop(self.tx.lock().take());
        let handle = self.drain_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("rule event drain thread panicked");
            }
        }
    }
}

impl Drop for RuleEventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

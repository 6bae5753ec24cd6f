//! Per-channel state stored in the hub

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::query::ChannelAddress;

use super::config::HubConfig;

/// Channel table shared by the hub and every subscriber guard
pub(super) type ChannelMap = RwLock<HashMap<ChannelAddress, Arc<ChannelEntry>>>;

/// Counters shared between a channel and its subscriber guards
///
/// Kept apart from the broadcast sender so that removing a channel from the
/// hub drops the sender and completes every subscriber. The subscriber count
/// only changes while the channel table is write-locked.
#[derive(Debug, Default)]
pub(super) struct ChannelActivity {
    subscribers: AtomicU32,
    published: AtomicU64,
}

impl ChannelActivity {
    fn subscriber_count(&self) -> u32 {
        self.subscribers.load(Ordering::Relaxed)
    }

    fn add_subscriber(&self) -> u32 {
        self.subscribers.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn remove_subscriber(&self) -> u32 {
        self.subscribers.fetch_sub(1, Ordering::Relaxed).saturating_sub(1)
    }
}

/// Entry for a single channel in the hub
pub(crate) struct ChannelEntry {
    /// Broadcast sender for fan-out to subscribers
    tx: broadcast::Sender<Bytes>,

    activity: Arc<ChannelActivity>,
}

impl ChannelEntry {
    pub(super) fn new(config: &HubConfig) -> Self {
        let (tx, _) = broadcast::channel(config.broadcast_capacity);

        Self {
            tx,
            activity: Arc::new(ChannelActivity::default()),
        }
    }

    /// Number of live subscribers
    pub(super) fn subscriber_count(&self) -> u32 {
        self.activity.subscriber_count()
    }

    /// Number of envelopes published so far
    pub(super) fn published_count(&self) -> u64 {
        self.activity.published.load(Ordering::Relaxed)
    }

    /// Register a subscriber, returning its receiver and release guard
    ///
    /// The caller must hold the write lock of the table the entry lives in;
    /// `channels` is that table, used by the guard to reap the channel.
    pub(super) fn subscribe(
        &self,
        address: &ChannelAddress,
        channels: Weak<ChannelMap>,
    ) -> (broadcast::Receiver<Bytes>, SubscriberGuard) {
        let rx = self.tx.subscribe();
        let count = self.activity.add_subscriber();

        tracing::debug!(address = %address, subscribers = count, "Subscriber added");

        let guard = SubscriberGuard {
            activity: Arc::clone(&self.activity),
            address: address.clone(),
            channels,
        };
        (rx, guard)
    }

    /// Send an envelope to all subscribers
    ///
    /// Returns the number of receivers, or 0 if there are none.
    pub(super) fn send(&self, payload: Bytes) -> usize {
        self.activity.published.fetch_add(1, Ordering::Relaxed);
        self.tx.send(payload).unwrap_or(0)
    }
}

/// Releases one subscriber slot when dropped
///
/// The last guard of a channel removes it from the table, unless the table
/// already holds a different channel under the same address.
#[derive(Debug)]
pub(super) struct SubscriberGuard {
    activity: Arc<ChannelActivity>,
    address: ChannelAddress,
    channels: Weak<ChannelMap>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        let Some(channels) = self.channels.upgrade() else {
            // hub is gone
            self.activity.remove_subscriber();
            return;
        };

        let mut channels = channels.write().unwrap_or_else(PoisonError::into_inner);
        let remaining = self.activity.remove_subscriber();
        tracing::debug!(
            address = %self.address,
            subscribers = remaining,
            "Subscriber released"
        );

        if remaining > 0 {
            return;
        }

        let current = channels
            .get(&self.address)
            .is_some_and(|entry| Arc::ptr_eq(&entry.activity, &self.activity));
        if current {
            channels.remove(&self.address);
            tracing::info!(address = %self.address, "Channel reaped");
        }
    }
}

/// Statistics for a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    /// Number of live subscribers
    pub subscriber_count: u32,
    /// Envelopes published since the channel was created
    pub published: u64,
}

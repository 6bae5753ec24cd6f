//! In-process channel hub
//!
//! A [`StreamingTransport`] that routes relay envelopes from publishers to
//! subscribers inside one process. Channels are keyed by [`ChannelAddress`],
//! created by the first subscriber and reaped when the last one leaves.
//! Publishing to a channel nobody subscribes to drops the envelope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::query::ChannelAddress;

use super::config::HubConfig;
use super::entry::{ChannelEntry, ChannelMap, ChannelStats, SubscriberGuard};
use super::error::TransportError;
use super::frame::DataFrame;
use super::transport::{FrameStream, StreamingTransport};

/// Registry of live channels with broadcast fan-out
///
/// `Bytes` is reference counted, so every subscriber shares the publisher's
/// allocation. The channel table is only locked for map updates and
/// non-blocking sends, never across an await.
pub struct ChannelHub {
    channels: Arc<ChannelMap>,
    config: HubConfig,
    shut_down: AtomicBool,
}

impl ChannelHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        Self {
            channels: Arc::new(ChannelMap::new(HashMap::new())),
            config,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ChannelAddress, Arc<ChannelEntry>>> {
        self.channels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ChannelAddress, Arc<ChannelEntry>>> {
        self.channels.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a raw envelope on a channel
    ///
    /// Returns the number of subscribers that will see it.
    pub fn publish(
        &self,
        address: &ChannelAddress,
        payload: impl Into<Bytes>,
    ) -> Result<usize, TransportError> {
        if self.is_shut_down() {
            return Err(TransportError::Shutdown);
        }

        // Sent under the read lock so the last subscriber cannot reap the
        // channel in between
        let receivers = self
            .read()
            .get(address)
            .map_or(0, |entry| entry.send(payload.into()));

        tracing::trace!(address = %address, receivers = receivers, "Envelope published");
        Ok(receivers)
    }

    /// Open a raw subscription on a channel
    fn subscribe_raw(
        &self,
        address: &ChannelAddress,
    ) -> Result<(broadcast::Receiver<Bytes>, SubscriberGuard), TransportError> {
        let mut channels = self.write();
        if self.is_shut_down() {
            return Err(TransportError::Shutdown);
        }

        let entry = channels.entry(address.clone()).or_insert_with(|| {
            tracing::info!(address = %address, "Channel created");
            Arc::new(ChannelEntry::new(&self.config))
        });
        Ok(entry.subscribe(address, Arc::downgrade(&self.channels)))
    }

    /// Close a channel, completing every subscription on it
    ///
    /// Returns false if the channel did not exist.
    pub fn close_channel(&self, address: &ChannelAddress) -> bool {
        let removed = self.write().remove(address);

        if let Some(entry) = removed {
            tracing::info!(
                address = %address,
                subscribers = entry.subscriber_count(),
                "Channel closed"
            );
            true
        } else {
            false
        }
    }

    /// Close every channel and refuse new subscriptions
    pub fn shutdown(&self) {
        let mut channels = self.write();
        self.shut_down.store(true, Ordering::SeqCst);
        let count = channels.len();
        channels.clear();

        tracing::info!(channels = count, "Channel hub shut down");
    }

    /// Whether [`ChannelHub::shutdown`] has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of subscribers on a channel (0 if it does not exist)
    pub fn subscriber_count(&self, address: &ChannelAddress) -> u32 {
        self.read()
            .get(address)
            .map_or(0, |entry| entry.subscriber_count())
    }

    /// Total subscribers across all channels
    pub fn total_subscribers(&self) -> u32 {
        self.read().values().map(|entry| entry.subscriber_count()).sum()
    }

    /// Get channel statistics
    pub fn channel_stats(&self, address: &ChannelAddress) -> Option<ChannelStats> {
        self.read().get(address).map(|entry| ChannelStats {
            subscriber_count: entry.subscriber_count(),
            published: entry.published_count(),
        })
    }

    /// Get total number of channels
    pub fn channel_count(&self) -> usize {
        self.read().len()
    }
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

struct HubSubscription {
    rx: broadcast::Receiver<Bytes>,
    address: ChannelAddress,
    _guard: SubscriberGuard,
}

#[async_trait]
impl StreamingTransport for ChannelHub {
    async fn subscribe(
        &self,
        address: &ChannelAddress,
        metadata: Value,
    ) -> Result<FrameStream, TransportError> {
        let (rx, guard) = self.subscribe_raw(address)?;

        tracing::debug!(address = %address, metadata = %metadata, "Hub subscription opened");

        let state = HubSubscription {
            rx,
            address: address.clone(),
            _guard: guard,
        };

        let frames = stream::unfold(state, |mut state| async move {
            loop {
                match state.rx.recv().await {
                    Ok(payload) => {
                        let frame = DataFrame::from_envelope(&payload);
                        return Some((frame, state));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            address = %state.address,
                            skipped = skipped,
                            "Subscriber lagging, envelopes skipped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(Box::pin(frames))
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        if self.is_shut_down() {
            Err(TransportError::Shutdown)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    fn addr(path: &str) -> ChannelAddress {
        ChannelAddress::new("ds-1", path)
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let hub = ChannelHub::new();
        let address = addr("sensor-1/1");

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        assert_eq!(hub.subscriber_count(&address), 1);

        let receivers = hub.publish(&address, &br#"{"message": {"v": 1}}"#[..]).unwrap();
        assert_eq!(receivers, 1);

        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame.field("value").unwrap().values[0], json!({"v": 1}));
    }

    #[tokio::test]
    async fn test_drop_releases_subscriber() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        let frames = hub.subscribe(&address, json!({})).await.unwrap();
        let other = hub.subscribe(&address, json!({})).await.unwrap();
        assert_eq!(hub.subscriber_count(&address), 2);

        drop(frames);
        assert_eq!(hub.subscriber_count(&address), 1);
        drop(other);
        assert_eq!(hub.total_subscribers(), 0);
    }

    #[tokio::test]
    async fn test_last_subscriber_reaps_channel() {
        let hub = ChannelHub::new();

        for bucket in 0..20 {
            let frames = hub.subscribe(&addr(&format!("a/{}", bucket)), json!({})).await.unwrap();
            drop(frames);
        }
        assert_eq!(hub.channel_count(), 0);

        let kept = hub.subscribe(&addr("a/kept"), json!({})).await.unwrap();
        let released = hub.subscribe(&addr("a/kept"), json!({})).await.unwrap();
        drop(released);
        assert_eq!(hub.channel_count(), 1);
        drop(kept);
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_creates_nothing() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        assert_eq!(hub.publish(&address, &br#"{"message": {}}"#[..]).unwrap(), 0);
        assert_eq!(hub.channel_count(), 0);
        assert!(hub.channel_stats(&address).is_none());
    }

    #[tokio::test]
    async fn test_resubscribe_after_reap() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        drop(hub.subscribe(&address, json!({})).await.unwrap());
        assert_eq!(hub.channel_count(), 0);

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        assert_eq!(hub.publish(&address, &br#"{"message": {"n": 2}}"#[..]).unwrap(), 1);
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame.field("value").unwrap().values[0], json!({"n": 2}));
        assert_eq!(hub.channel_stats(&address).unwrap().published, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_churn_keeps_live_subscriptions() {
        let hub = Arc::new(ChannelHub::new());
        let address = addr("churn/1");

        let mut tasks = Vec::new();
        for worker in 0..8 {
            let hub = Arc::clone(&hub);
            let address = address.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..50 {
                    let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
                    let payload = format!(r#"{{"message": {{"w": {}, "r": {}}}}}"#, worker, round);
                    assert!(hub.publish(&address, payload).unwrap() >= 1);
                    // Our own envelope is buffered, so the stream cannot end empty
                    assert!(frames.next().await.unwrap().is_ok());
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(hub.total_subscribers(), 0);
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_close_channel_completes_subscribers() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        hub.publish(&address, &br#"{"message": {}}"#[..]).unwrap();
        assert!(hub.close_channel(&address));
        assert!(!hub.close_channel(&address));

        // Buffered envelope is still delivered, then the stream ends
        assert!(frames.next().await.unwrap().is_ok());
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_release_after_close_keeps_new_channel() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        let old = hub.subscribe(&address, json!({})).await.unwrap();
        hub.close_channel(&address);
        let _new = hub.subscribe(&address, json!({})).await.unwrap();

        drop(old);
        assert_eq!(hub.subscriber_count(&address), 1);
    }

    #[tokio::test]
    async fn test_decode_error_does_not_end_stream() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        hub.publish(&address, &b"garbage"[..]).unwrap();
        hub.publish(&address, &br#"{"message": {"ok": 1}}"#[..]).unwrap();

        assert!(matches!(
            frames.next().await,
            Some(Err(TransportError::Decode(_)))
        ));
        assert!(frames.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips() {
        let hub = ChannelHub::with_config(HubConfig::default().broadcast_capacity(2));
        let address = addr("a/1");

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        for i in 0..5 {
            let payload = format!(r#"{{"message": {{"i": {}}}}}"#, i);
            hub.publish(&address, payload).unwrap();
        }

        // Oldest envelopes were overwritten; the newest two remain
        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(frame.field("value").unwrap().values[0], json!({"i": 3}));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let hub = ChannelHub::new();
        let address = addr("a/1");

        let mut frames = hub.subscribe(&address, json!({})).await.unwrap();
        hub.shutdown();

        assert!(frames.next().await.is_none());
        assert!(matches!(
            hub.subscribe(&address, json!({})).await,
            Err(TransportError::Shutdown)
        ));
        assert!(hub.check_health().await.is_err());
        assert_eq!(hub.channel_count(), 0);
    }
}

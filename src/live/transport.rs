//! Streaming transport capability

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::query::ChannelAddress;

use super::error::TransportError;
use super::frame::DataFrame;

/// Ordered frames from one subscription
///
/// Dropping the stream releases the subscription; there is no other
/// teardown call.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<DataFrame, TransportError>> + Send>>;

/// A transport that can open live subscriptions
///
/// Connection management, authentication and framing all live behind this
/// trait. Retry policy, if any, belongs to the implementation.
#[async_trait]
pub trait StreamingTransport: Send + Sync {
    /// Open a subscription on `address`
    ///
    /// `metadata` is forwarded verbatim to the backend.
    async fn subscribe(
        &self,
        address: &ChannelAddress,
        metadata: Value,
    ) -> Result<FrameStream, TransportError>;

    /// Check that the backend is reachable
    async fn check_health(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[async_trait]
impl<T: StreamingTransport + ?Sized> StreamingTransport for Arc<T> {
    async fn subscribe(
        &self,
        address: &ChannelAddress,
        metadata: Value,
    ) -> Result<FrameStream, TransportError> {
        (**self).subscribe(address, metadata).await
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        (**self).check_health().await
    }
}

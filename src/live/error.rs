//! Transport error types

use crate::query::ChannelAddress;

/// Error raised by a streaming transport
///
/// Scoped to one subscription. Cloneable so it can be forwarded to the
/// consumer of a merged stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The subscription could not be established
    #[error("subscribe to {address} failed: {reason}")]
    Subscribe {
        /// Channel that was requested
        address: ChannelAddress,
        /// Transport-specific reason
        reason: String,
    },

    /// An established subscription broke
    #[error("connection lost: {0}")]
    Connection(String),

    /// A payload could not be turned into a frame
    #[error("failed to decode frame: {0}")]
    Decode(String),

    /// The transport has been shut down
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Build a subscribe error
    pub fn subscribe(address: &ChannelAddress, reason: impl Into<String>) -> Self {
        TransportError::Subscribe {
            address: address.clone(),
            reason: reason.into(),
        }
    }
}

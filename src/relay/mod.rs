//! Backend side of a relay subscription
//!
//! When a host forwards a channel subscription to the backend, it passes the
//! resolved query's metadata along. This module decodes that metadata
//! ([`StreamRequest`]) and plans the relay consumer that serves it
//! ([`ConsumerPlan`]). Frames are decoded with
//! [`crate::live::DataFrame::from_envelope`].

pub mod plan;
pub mod request;

pub use plan::{ConsumerPlan, DeliverPolicy};
pub use request::StreamRequest;

/// Answer to a subscribe or publish request on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPermission {
    /// Request allowed
    Ok,
    /// Request refused
    PermissionDenied,
}

/// Subscriptions are always allowed
pub fn subscribe_permission(_request: &StreamRequest) -> StreamPermission {
    StreamPermission::Ok
}

/// Channels are read-only for clients
pub fn publish_permission() -> StreamPermission {
    StreamPermission::PermissionDenied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissions() {
        let request = StreamRequest {
            ref_id: "A".into(),
            topic: "t".into(),
            start_time: None,
            path: None,
        };

        assert_eq!(subscribe_permission(&request), StreamPermission::Ok);
        assert_eq!(publish_permission(), StreamPermission::PermissionDenied);
    }
}

//! Channel hub configuration

/// Configuration for [`super::ChannelHub`]
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Per-channel broadcast capacity (envelopes a slow subscriber may lag by)
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 1024,
        }
    }
}

impl HubConfig {
    /// Set the broadcast capacity (minimum one)
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity.max(1);
        self
    }
}

//! Resolved queries and channel addresses

use serde::Serialize;
use serde_json::{json, Value};

/// Scope of a live channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveChannelScope {
    /// Channel owned by a data-source instance
    DataSource,
}

impl LiveChannelScope {
    /// Short prefix used when rendering addresses
    pub fn as_str(&self) -> &'static str {
        match self {
            LiveChannelScope::DataSource => "ds",
        }
    }
}

/// Destination of a subscription (scope + namespace + path)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelAddress {
    /// Channel scope
    pub scope: LiveChannelScope,
    /// Data-source instance identifier
    pub namespace: String,
    /// Path within the namespace
    pub path: String,
}

impl ChannelAddress {
    /// Create a data-source scoped address
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scope: LiveChannelScope::DataSource,
            namespace: namespace.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.scope.as_str(), self.namespace, self.path)
    }
}

/// A query target after substitution and addressing
///
/// Lives for one subscription attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Identity of the originating target
    pub ref_id: String,
    /// Substituted topic
    pub topic: String,
    /// Substituted time anchor text
    pub start_time: String,
    /// Time bucket the anchor falls into (epoch seconds)
    pub time_bucket: i64,
    /// Where to subscribe
    pub address: ChannelAddress,
}

impl ResolvedQuery {
    /// Metadata handed to the transport alongside the address
    ///
    /// The backend stream handler decodes this object, so the field names are
    /// part of the wire contract.
    pub fn metadata(&self) -> Value {
        json!({
            "refId": self.ref_id,
            "topic": self.topic,
            "start_time": self.start_time,
            "path": self.time_bucket,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        let addr = ChannelAddress::new("ds-42", "sensor-1/1704067200");
        assert_eq!(addr.to_string(), "ds/ds-42/sensor-1/1704067200");
    }

    #[test]
    fn test_metadata_fields() {
        let query = ResolvedQuery {
            ref_id: "A".into(),
            topic: "sensor-1".into(),
            start_time: "2024-01-01T00:00:00.000Z".into(),
            time_bucket: 1704067200,
            address: ChannelAddress::new("ds-42", "sensor-1/1704067200"),
        };

        let meta = query.metadata();
        assert_eq!(meta["topic"], "sensor-1");
        assert_eq!(meta["start_time"], "2024-01-01T00:00:00.000Z");
        assert_eq!(meta["path"], 1704067200);
        assert_eq!(meta["refId"], "A");
    }
}

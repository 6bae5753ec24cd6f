//! Stream requests received by the backend

use serde::Deserialize;

use crate::error::{Error, Result};

/// Subscription metadata as the backend receives it
///
/// Mirrors [`crate::query::ResolvedQuery::metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamRequest {
    /// Originating query
    #[serde(rename = "refId", default)]
    pub ref_id: String,

    /// Substituted topic
    #[serde(default)]
    pub topic: String,

    /// Substituted time anchor (RFC 3339)
    #[serde(default)]
    pub start_time: Option<String>,

    /// Time bucket the anchor falls into
    #[serde(default)]
    pub path: Option<i64>,
}

impl StreamRequest {
    /// Decode request data sent with a subscription
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let request: StreamRequest = serde_json::from_slice(data)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        if request.topic.trim().is_empty() {
            return Err(Error::InvalidRequest("topic is empty".into()));
        }
        Ok(request)
    }
}

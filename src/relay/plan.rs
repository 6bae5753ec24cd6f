//! Consumer planning for relay subscriptions
//!
//! Every data-source namespace owns one relay stream named
//! `{namespace}_stream`; each topic is a subject on it. A subscription with a
//! time bucket gets a durable consumer named after the bucket, so repeated
//! queries with an unchanged anchor share a consumer.

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};

use super::request::StreamRequest;

/// Where a new consumer starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverPolicy {
    /// Only messages published after the consumer is created
    New,
    /// Messages from the given instant onwards
    ByStartTime(DateTime<FixedOffset>),
}

/// How the backend should consume one subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerPlan {
    /// Relay stream holding the namespace's subjects
    pub stream_name: String,
    /// Subject the topic is published on
    pub subject: String,
    /// Durable consumer name
    pub consumer_name: String,
    /// Start position
    pub deliver: DeliverPolicy,
}

impl ConsumerPlan {
    /// Plan the consumer for `request` inside `namespace`
    pub fn new(namespace: &str, request: &StreamRequest) -> Result<Self> {
        if namespace.trim().is_empty() {
            return Err(Error::InvalidRequest("namespace is empty".into()));
        }

        let stream_name = format!("{}_stream", namespace);
        let subject = format!("{}_{}", stream_name, request.topic);

        let deliver = match request.start_time.as_deref() {
            Some(start) => DateTime::parse_from_rfc3339(start)
                .map(DeliverPolicy::ByStartTime)
                .map_err(|e| Error::InvalidRequest(format!("start_time {:?}: {}", start, e)))?,
            None => DeliverPolicy::New,
        };

        let consumer_name = match request.path {
            Some(bucket) => bucket.to_string(),
            None => subject.clone(),
        };

        tracing::debug!(
            stream = %stream_name,
            subject = %subject,
            consumer = %consumer_name,
            "Planned relay consumer"
        );

        Ok(Self {
            stream_name,
            subject,
            consumer_name,
            deliver,
        })
    }
}

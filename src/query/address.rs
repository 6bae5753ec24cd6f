//! Channel address resolution
//!
//! Turns a [`QueryTarget`] into a [`ResolvedQuery`]:
//!
//! 1. substitute the time anchor (or the default anchor)
//! 2. substitute the topic
//! 3. parse the anchor into an instant and floor it to a time bucket
//! 4. build the path `"{topic}/{bucket}"` under the caller's namespace
//!
//! Resolution is re-run for every query run, so scope changes (a new
//! dashboard time range, a changed variable) are always picked up. Two runs
//! with the same topic inside the same bucket land on the same channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;

use crate::template::{ScopedVars, TemplateError, TemplateResolver};

use super::resolved::{ChannelAddress, ResolvedQuery};
use super::target::{QueryTarget, DEFAULT_TIME_ANCHOR};

/// Error resolving a single query target
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Substituting the topic failed
    #[error("failed to substitute topic: {0}")]
    Topic(#[source] TemplateError),

    /// Substituting the time anchor failed
    #[error("failed to substitute time anchor: {0}")]
    TimeAnchor(#[source] TemplateError),

    /// The substituted time anchor is not a timestamp
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Resolves query targets into channel addresses
#[derive(Clone)]
pub struct AddressResolver {
    templates: Arc<dyn TemplateResolver>,
    default_anchor: String,
    granularity_secs: i64,
}

impl AddressResolver {
    /// Create a resolver with the default anchor and one-second buckets
    pub fn new(templates: Arc<dyn TemplateResolver>) -> Self {
        Self {
            templates,
            default_anchor: DEFAULT_TIME_ANCHOR.to_string(),
            granularity_secs: 1,
        }
    }

    /// Set the anchor used for targets without one
    pub fn default_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.default_anchor = anchor.into();
        self
    }

    /// Set the bucket width (whole seconds, minimum one)
    pub fn bucket_granularity(mut self, granularity: Duration) -> Self {
        self.granularity_secs = granularity.as_secs().clamp(1, i64::MAX as u64) as i64;
        self
    }

    /// Bucket width in seconds
    pub fn granularity_secs(&self) -> i64 {
        self.granularity_secs
    }

    /// Resolve one target against `scope` under `namespace`
    pub fn resolve(
        &self,
        target: &QueryTarget,
        scope: &ScopedVars,
        namespace: &str,
    ) -> Result<ResolvedQuery, ResolveError> {
        let anchor_template = target.start_time_or(&self.default_anchor);
        let start_time = self
            .templates
            .replace(anchor_template, scope)
            .map_err(ResolveError::TimeAnchor)?;

        let topic = self
            .templates
            .replace(target.topic(), scope)
            .map_err(ResolveError::Topic)?;

        let epoch_secs = parse_epoch_seconds(&start_time)?;
        let time_bucket = bucket_of(epoch_secs, self.granularity_secs);
        let path = channel_path(&topic, time_bucket);

        tracing::trace!(
            ref_id = %target.ref_id,
            topic = %topic,
            start_time = %start_time,
            bucket = time_bucket,
            "Resolved query target"
        );

        Ok(ResolvedQuery {
            ref_id: target.ref_id.clone(),
            topic,
            start_time,
            time_bucket,
            address: ChannelAddress::new(namespace, path),
        })
    }
}

impl std::fmt::Debug for AddressResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressResolver")
            .field("default_anchor", &self.default_anchor)
            .field("granularity_secs", &self.granularity_secs)
            .finish_non_exhaustive()
    }
}

/// Path for a topic within a time bucket
pub fn channel_path(topic: &str, bucket: i64) -> String {
    format!("{}/{}", topic, bucket)
}

/// Floor `epoch_secs` to a multiple of `granularity_secs`
pub fn bucket_of(epoch_secs: i64, granularity_secs: i64) -> i64 {
    epoch_secs.div_euclid(granularity_secs) * granularity_secs
}

/// Parse an RFC 3339 instant or epoch milliseconds into whole epoch seconds
///
/// Fractional seconds are floored.
pub fn parse_epoch_seconds(text: &str) -> Result<i64, ResolveError> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Ok(instant.timestamp());
    }

    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(millis) = text.parse::<i64>() {
            return Ok(millis.div_euclid(1000));
        }
    }

    Err(ResolveError::InvalidTimestamp(text.to_string()))
}

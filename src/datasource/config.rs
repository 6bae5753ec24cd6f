//! Data-source configuration

use std::time::Duration;

use crate::fanout::DEFAULT_CHANNEL_CAPACITY;
use crate::query::DEFAULT_TIME_ANCHOR;

/// Query-run configuration options
#[derive(Debug, Clone)]
pub struct DataSourceConfig {
    /// Time anchor for targets that do not set one
    pub default_time_anchor: String,

    /// Width of a time bucket (whole seconds)
    pub bucket_granularity: Duration,

    /// Capacity of the channel feeding a merged stream
    pub channel_capacity: usize,

    /// Reject templates that reference unknown variables
    pub strict_templates: bool,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            default_time_anchor: DEFAULT_TIME_ANCHOR.to_string(),
            bucket_granularity: Duration::from_secs(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            strict_templates: true,
        }
    }
}

impl DataSourceConfig {
    /// Set the default time anchor
    pub fn default_time_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.default_time_anchor = anchor.into();
        self
    }

    /// Set the bucket granularity (rounded down to whole seconds, minimum one)
    pub fn bucket_granularity(mut self, granularity: Duration) -> Self {
        self.bucket_granularity = Duration::from_secs(granularity.as_secs().max(1));
        self
    }

    /// Set the merged-stream channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Leave unknown template variables untouched instead of failing
    pub fn lenient_templates(mut self) -> Self {
        self.strict_templates = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DataSourceConfig::default();

        assert_eq!(config.default_time_anchor, "${__from:date:iso}");
        assert_eq!(config.bucket_granularity, Duration::from_secs(1));
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.strict_templates);
    }

    #[test]
    fn test_builder_granularity_floor() {
        let config = DataSourceConfig::default().bucket_granularity(Duration::from_millis(1500));
        assert_eq!(config.bucket_granularity, Duration::from_secs(1));

        let config = DataSourceConfig::default().bucket_granularity(Duration::from_millis(10));
        assert_eq!(config.bucket_granularity, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = DataSourceConfig::default()
            .default_time_anchor("${__to:date:iso}")
            .bucket_granularity(Duration::from_secs(60))
            .channel_capacity(0)
            .lenient_templates();

        assert_eq!(config.default_time_anchor, "${__to:date:iso}");
        assert_eq!(config.bucket_granularity, Duration::from_secs(60));
        assert_eq!(config.channel_capacity, 1);
        assert!(!config.strict_templates);
    }
}

//! Live data-source instance
//!
//! Composes instance settings, the address resolver and a streaming
//! transport into the entry point a host calls for each panel query.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::Result;
use crate::fanout::{FanOut, MergedStream};
use crate::live::StreamingTransport;
use crate::query::target::assign_ref_ids;
use crate::query::{is_eligible, AddressResolver, QueryTarget, ResolvedQuery};
use crate::template::{ScopedVars, TemplateResolver, TimeRange, VariableInterpolator};

use super::config::DataSourceConfig;
use super::settings::DataSourceSettings;

/// Time range as sent by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RequestRange {
    /// Start of the range
    pub from: DateTime<Utc>,
    /// End of the range
    pub to: DateTime<Utc>,
}

/// A batch query from a panel
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryRequest {
    /// Targets in panel order
    #[serde(default)]
    pub targets: Vec<QueryTarget>,

    /// Variable bindings
    #[serde(rename = "scopedVars", default)]
    pub scoped_vars: ScopedVars,

    /// Dashboard time range
    #[serde(default)]
    pub range: Option<RequestRange>,
}

impl QueryRequest {
    /// Create a request for `targets` with an empty scope
    pub fn new(targets: Vec<QueryTarget>) -> Self {
        Self {
            targets,
            ..Default::default()
        }
    }

    /// Set the dashboard time range
    pub fn with_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.range = Some(RequestRange { from, to });
        self
    }

    /// Set the variable bindings
    pub fn with_scoped_vars(mut self, scoped_vars: ScopedVars) -> Self {
        self.scoped_vars = scoped_vars;
        self
    }

    /// Scope used for substitution (bindings plus time range)
    pub fn scope(&self) -> ScopedVars {
        match self.range {
            Some(range) => self
                .scoped_vars
                .clone()
                .with_range(TimeRange::new(range.from, range.to)),
            None => self.scoped_vars.clone(),
        }
    }
}

/// Health check outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend reachable
    Ok,
    /// Backend unreachable
    Error,
}

/// Result of [`LiveDataSource::check_health`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckResult {
    /// Outcome
    pub status: HealthStatus,
    /// Human-readable message
    pub message: String,
}

/// A live, topic-addressed data source
pub struct LiveDataSource<T: StreamingTransport + 'static> {
    settings: DataSourceSettings,
    transport: Arc<T>,
    fan_out: FanOut<T>,
}

impl<T: StreamingTransport + 'static> LiveDataSource<T> {
    /// Create a data source using the built-in template interpolator
    pub fn new(settings: DataSourceSettings, config: DataSourceConfig, transport: Arc<T>) -> Self {
        let interpolator = if config.strict_templates {
            VariableInterpolator::new()
        } else {
            VariableInterpolator::lenient()
        };
        Self::with_templates(settings, config, transport, Arc::new(interpolator))
    }

    /// Create a data source with a host-supplied template resolver
    pub fn with_templates(
        settings: DataSourceSettings,
        config: DataSourceConfig,
        transport: Arc<T>,
        templates: Arc<dyn TemplateResolver>,
    ) -> Self {
        let resolver = AddressResolver::new(templates)
            .default_anchor(config.default_time_anchor.clone())
            .bucket_granularity(config.bucket_granularity);
        let fan_out =
            FanOut::new(Arc::clone(&transport), resolver).channel_capacity(config.channel_capacity);

        tracing::info!(
            uid = %settings.uid,
            endpoint = %settings.endpoint(),
            granularity_secs = config.bucket_granularity.as_secs(),
            "Data source created"
        );

        Self {
            settings,
            transport,
            fan_out,
        }
    }

    /// Instance identifier (channel namespace)
    pub fn uid(&self) -> &str {
        &self.settings.uid
    }

    /// Instance settings
    pub fn settings(&self) -> &DataSourceSettings {
        &self.settings
    }

    /// Query a new panel starts with
    pub fn default_query(&self) -> QueryTarget {
        QueryTarget::default_query()
    }

    /// Whether a target will be run
    pub fn filter_query(&self, target: &QueryTarget) -> bool {
        is_eligible(target)
    }

    /// Resolve one target the way [`LiveDataSource::query`] would
    pub fn apply_template_variables(
        &self,
        target: &QueryTarget,
        scope: &ScopedVars,
    ) -> Result<ResolvedQuery> {
        Ok(self.fan_out.resolver().resolve(target, scope, self.uid())?)
    }

    /// Run a batch query, returning the merged live stream
    ///
    /// Subscriptions run on the current tokio runtime; without one, every
    /// resolvable target yields an error item and nothing is opened.
    pub fn query(&self, request: &QueryRequest) -> MergedStream {
        let mut targets = request.targets.clone();
        assign_ref_ids(&mut targets);

        self.fan_out.run(&targets, &request.scope(), self.uid())
    }

    /// Check that the backend is reachable
    pub async fn check_health(&self) -> HealthCheckResult {
        match self.transport.check_health().await {
            Ok(()) => HealthCheckResult {
                status: HealthStatus::Ok,
                message: "Connection successfully established".into(),
            },
            Err(e) => {
                tracing::warn!(uid = %self.uid(), error = %e, "Health check failed");
                HealthCheckResult {
                    status: HealthStatus::Error,
                    message: "Connection not working".into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::error::Error;
    use crate::live::ChannelHub;
    use crate::query::ChannelAddress;

    fn data_source(hub: Arc<ChannelHub>) -> LiveDataSource<ChannelHub> {
        LiveDataSource::new(
            DataSourceSettings::new("ds-42", "relay.local"),
            DataSourceConfig::default(),
            hub,
        )
    }

    fn jan_first() -> DateTime<Utc> {
        DateTime::from_timestamp(1704067200, 0).unwrap()
    }

    #[test]
    fn test_request_from_json() {
        let json = r#"{
            "targets": [{"refId": "A", "topic": "$device"}],
            "scopedVars": {"device": {"text": "S1", "value": "sensor-1"}},
            "range": {"from": "2024-01-01T00:00:00Z", "to": "2024-01-01T01:00:00Z"}
        }"#;
        let request: QueryRequest = serde_json::from_str(json).unwrap();
        let scope = request.scope();

        assert_eq!(request.targets.len(), 1);
        assert_eq!(scope.get("device").unwrap().value, "sensor-1");
        assert_eq!(scope.range().unwrap().from, jan_first());
    }

    #[tokio::test]
    async fn test_apply_template_variables() {
        let ds = data_source(Arc::new(ChannelHub::new()));
        let request = QueryRequest::new(vec![]).with_range(jan_first(), jan_first());

        let resolved = ds
            .apply_template_variables(&QueryTarget::new("A", "sensor-1"), &request.scope())
            .unwrap();
        assert_eq!(resolved.address, ChannelAddress::new("ds-42", "sensor-1/1704067200"));

        let err = ds
            .apply_template_variables(&QueryTarget::new("A", "sensor-1"), &ScopedVars::new())
            .unwrap_err();
        assert!(matches!(err, Error::Resolve(_)));
    }

    #[tokio::test]
    async fn test_query_assigns_ref_ids() {
        let hub = Arc::new(ChannelHub::new());
        let ds = data_source(Arc::clone(&hub));
        let request = QueryRequest::new(vec![QueryTarget {
            ref_id: String::new(),
            topic: Some("t".into()),
            start_time: Some("not a time".into()),
            hide: false,
        }]);

        let mut merged = ds.query(&request);
        let item = merged.next().await.unwrap();
        assert_eq!(item.ref_id(), "A");
        assert!(item.is_error());
        assert!(merged.next().await.is_none());
    }

    #[tokio::test]
    async fn test_default_and_filter() {
        let ds = data_source(Arc::new(ChannelHub::new()));

        assert!(!ds.filter_query(&ds.default_query()));
        assert!(ds.filter_query(&QueryTarget::new("A", "x")));
        assert_eq!(ds.uid(), "ds-42");
    }

    #[test]
    fn test_query_without_runtime() {
        let hub = Arc::new(ChannelHub::new());
        let ds = data_source(Arc::clone(&hub));
        let request = QueryRequest::new(vec![QueryTarget::new("", "sensor-1")])
            .with_range(jan_first(), jan_first());

        let mut merged = ds.query(&request);
        let item = futures::executor::block_on(merged.next()).unwrap();
        assert_eq!(item.ref_id(), "A");
        assert!(item.is_error());
        assert!(futures::executor::block_on(merged.next()).is_none());
        assert_eq!(hub.channel_count(), 0);
    }

    #[tokio::test]
    async fn test_check_health() {
        let hub = Arc::new(ChannelHub::new());
        let ds = data_source(Arc::clone(&hub));

        assert_eq!(ds.check_health().await.status, HealthStatus::Ok);

        hub.shutdown();
        let result = ds.check_health().await;
        assert_eq!(result.status, HealthStatus::Error);
        assert_eq!(result.message, "Connection not working");
    }
}

//! Data-source instance
//!
//! [`LiveDataSource`] is what a host creates per configured instance. It reads
//! the instance settings once, owns the transport by composition and turns each
//! [`QueryRequest`] into a [`crate::fanout::MergedStream`].

pub mod config;
pub mod plugin;
pub mod settings;

pub use config::DataSourceConfig;
pub use plugin::{HealthCheckResult, HealthStatus, LiveDataSource, QueryRequest, RequestRange};
pub use settings::{DataSourceOptions, DataSourceSettings, SecureSettings};

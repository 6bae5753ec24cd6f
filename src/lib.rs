//! # relay-live
//!
//! Live query fan-out for topic-addressed streaming data sources.
//!
//! A panel submits a batch of [`QueryTarget`]s. Each eligible target is
//! resolved into a channel address whose path combines the substituted topic
//! with a time bucket derived from the query's time anchor, then subscribed
//! through a [`StreamingTransport`]. All subscriptions are merged into one
//! arrival-ordered [`MergedStream`]; dropping it releases every subscription.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use relay_live::{
//!     ChannelHub, DataSourceConfig, DataSourceSettings, LiveDataSource, QueryRequest, QueryTarget,
//! };
//!
//! # async fn example() {
//! let hub = Arc::new(ChannelHub::new());
//! let settings = DataSourceSettings::new("ds-42", "relay.local");
//! let ds = LiveDataSource::new(settings, DataSourceConfig::default(), hub);
//!
//! let request = QueryRequest::new(vec![QueryTarget::new("A", "sensor-1")])
//!     .with_range(chrono::Utc::now(), chrono::Utc::now());
//! let mut stream = ds.query(&request);
//! while let Some(item) = stream.next().await {
//!     println!("{:?}", item);
//! }
//! # }
//! ```

pub mod datasource;
pub mod error;
pub mod fanout;
pub mod live;
pub mod query;
pub mod relay;
pub mod template;

pub use datasource::{DataSourceConfig, DataSourceSettings, LiveDataSource, QueryRequest};
pub use error::{Error, Result};
pub use fanout::{FanOut, MergedStream, QueryError, QueryResponse, RunStats};
pub use live::{ChannelHub, DataFrame, FrameStream, StreamingTransport, TransportError};
pub use query::{AddressResolver, ChannelAddress, QueryTarget, ResolvedQuery};
pub use template::{ScopedVars, TemplateResolver, VariableInterpolator};

//! Live panel demo
//!
//! Runs a two-query panel against an in-process channel hub while a
//! background task publishes sensor readings.
//!
//! Run with: cargo run --example live_panel [TOPIC...]
//!
//! Examples:
//!   cargo run --example live_panel                   # topics: sensor-1, sensor-2
//!   cargo run --example live_panel boiler fan ""     # empty topics are skipped
//!   RUST_LOG=relay_live=trace cargo run --example live_panel

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;

use relay_live::{
    ChannelHub, DataSourceConfig, DataSourceSettings, LiveDataSource, QueryRequest,
    QueryResponse, QueryTarget,
};

const SETTINGS: &str = r#"{
    "uid": "demo-ds",
    "name": "Relay demo",
    "jsonData": {"path": "localhost"},
    "secureJsonData": {"apiKey": "demo-key", "secretKey": "demo-secret"}
}"#;

/// Number of frames to print before cancelling the panel
const FRAMES_TO_SHOW: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("relay_live=debug".parse()?)
                .add_directive("live_panel=debug".parse()?),
        )
        .init();

    let mut topics: Vec<String> = std::env::args().skip(1).collect();
    if topics.is_empty() {
        topics = vec!["sensor-1".into(), "sensor-2".into()];
    }

    let settings = DataSourceSettings::from_json(SETTINGS.as_bytes())?;
    let hub = Arc::new(ChannelHub::new());
    let ds = LiveDataSource::new(settings, DataSourceConfig::default(), Arc::clone(&hub));

    let health = ds.check_health().await;
    tracing::info!(status = ?health.status, message = %health.message, "Health check");

    let now = Utc::now();
    let targets = topics
        .iter()
        .map(|topic| QueryTarget::new("", topic.as_str()))
        .collect();
    let request = QueryRequest::new(targets).with_range(now, now + chrono::Duration::hours(1));

    // Resolve up front so the publisher knows which channels to feed
    let scope = request.scope();
    let mut channels = Vec::new();
    for target in request.targets.iter().filter(|t| ds.filter_query(t)) {
        match ds.apply_template_variables(target, &scope) {
            Ok(resolved) => channels.push(resolved.address),
            Err(e) => tracing::warn!(topic = %target.topic(), error = %e, "Not publishing"),
        }
    }

    let publisher_hub = Arc::clone(&hub);
    let publisher = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(250));
        let mut reading = 0u64;
        loop {
            ticker.tick().await;
            for address in &channels {
                let payload = format!(
                    r#"{{"start": {}, "message": {{"reading": {}}}}}"#,
                    Utc::now().timestamp_millis(),
                    reading
                );
                if let Err(e) = publisher_hub.publish(address, payload) {
                    tracing::error!(address = %address, error = %e, "Publish failed");
                    return;
                }
            }
            reading += 1;
        }
    });

    let mut merged = ds.query(&request);
    let mut shown = 0;
    while let Some(item) = merged.next().await {
        match item {
            QueryResponse::Data { ref_id, key, frame } => {
                println!("[{}] {} -> {:?}", ref_id, key, frame.field("value"));
                shown += 1;
                if shown == FRAMES_TO_SHOW {
                    break;
                }
            }
            QueryResponse::Error { ref_id, error } => {
                println!("[{}] error: {}", ref_id, error);
            }
        }
    }

    println!("Run stats: {:?}", merged.stats());
    drop(merged);

    publisher.abort();
    hub.shutdown();
    Ok(())
}

//! Live streaming transport
//!
//! The fan-out engine only sees the [`StreamingTransport`] capability:
//! `subscribe(address, metadata) -> FrameStream`. Dropping a
//! [`FrameStream`] is how a subscription is released.
//!
//! [`ChannelHub`] is an in-process implementation built on
//! `tokio::sync::broadcast`. A channel lives while it has subscribers; the
//! last released subscription removes it from the table.
//!
//! ```text
//!                      Arc<ChannelHub>
//!                ┌────────────────────────────┐
//!                │ channels: HashMap<Address, │
//!                │   broadcast::Sender >      │
//!                └─────────────┬──────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        ▼                     ▼                     ▼
//!   [Publisher]           [FrameStream]         [FrameStream]
//!   hub.publish()         envelope -> frame     envelope -> frame
//! ```

pub mod config;
mod entry;
pub mod error;
pub mod frame;
pub mod hub;
pub mod transport;

pub use config::HubConfig;
pub use entry::ChannelStats;
pub use error::TransportError;
pub use frame::{DataFrame, Field};
pub use hub::ChannelHub;
pub use transport::{FrameStream, StreamingTransport};

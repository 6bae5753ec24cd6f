//! Query targets, eligibility and channel addressing
//!
//! ```text
//!   QueryTarget ──is_eligible──► AddressResolver::resolve ──► ResolvedQuery
//!   (topic, start_time)          (substitute, bucket, path)   (topic, start_time,
//!                                                               ChannelAddress)
//! ```
//!
//! Everything here is synchronous and stateless; nothing suspends.

pub mod address;
pub mod filter;
pub mod resolved;
pub mod target;

pub use address::{AddressResolver, ResolveError};
pub use filter::is_eligible;
pub use resolved::{ChannelAddress, LiveChannelScope, ResolvedQuery};
pub use target::{QueryTarget, DEFAULT_TIME_ANCHOR};

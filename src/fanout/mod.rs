//! Query fan-out and stream merging
//!
//! ```text
//!   targets ──filter──► resolve ──► worker per query ──┐
//!                         │          (owns one         │  mpsc
//!                         │           subscription)    ├────────► MergedStream
//!                         └─► resolution errors ───────┘           (arrival order)
//! ```
//!
//! Errors never cross query boundaries: a target that fails to resolve or
//! whose subscription fails shows up as a [`QueryResponse::Error`] for that
//! `ref_id` while its siblings keep streaming.

pub mod merge;
pub mod response;
pub mod stats;

pub use merge::{FanOut, MergedStream, DEFAULT_CHANNEL_CAPACITY};
pub use response::{QueryError, QueryResponse};
pub use stats::RunStats;

//! Error types
//!
//! The crate-level [`Error`] wraps the per-area errors so callers of the
//! data-source entry points can use a single `Result`. Errors raised inside a
//! query run never surface here: they are scoped to one target and travel
//! through the merged stream as [`crate::fanout::QueryError`].

use crate::live::TransportError;
use crate::query::ResolveError;
use crate::template::TemplateError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Data-source settings are missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A backend stream request could not be interpreted
    #[error("invalid stream request: {0}")]
    InvalidRequest(String),

    /// Template substitution failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A query target could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The streaming transport failed
    #[error(transparent)]
    Transport(#[from] TransportError),
}

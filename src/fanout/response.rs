//! Items yielded by a merged query stream

use crate::live::{DataFrame, TransportError};
use crate::query::ResolveError;

/// Failure scoped to one query of a batch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The target could not be resolved; it opened no subscription
    #[error("query resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    /// The target's subscription failed to open or reported an error
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// One item of a merged query stream
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// A frame from one query's subscription
    Data {
        /// Originating query
        ref_id: String,
        /// Channel the frame arrived on
        key: String,
        /// Frame payload
        frame: DataFrame,
    },

    /// A diagnostic for one query
    Error {
        /// Originating query
        ref_id: String,
        /// What went wrong
        error: QueryError,
    },
}

impl QueryResponse {
    /// Identity of the query this item belongs to
    pub fn ref_id(&self) -> &str {
        match self {
            QueryResponse::Data { ref_id, .. } | QueryResponse::Error { ref_id, .. } => ref_id,
        }
    }

    /// Frame, if this is a data item
    pub fn frame(&self) -> Option<&DataFrame> {
        match self {
            QueryResponse::Data { frame, .. } => Some(frame),
            QueryResponse::Error { .. } => None,
        }
    }

    /// Error, if this is a diagnostic
    pub fn error(&self) -> Option<&QueryError> {
        match self {
            QueryResponse::Error { error, .. } => Some(error),
            QueryResponse::Data { .. } => None,
        }
    }

    /// Whether this item is a diagnostic
    pub fn is_error(&self) -> bool {
        matches!(self, QueryResponse::Error { .. })
    }
}

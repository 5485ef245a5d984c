use thiserror::Error;

use crate::interval::IntervalError;

/// Errors from governor fetches.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GovernorError {
    /// The backend could not fetch the span.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The fetch was cancelled before it completed.
    #[error("Fetch cancelled")]
    Cancelled,

    /// The backend could not express the request.
    #[error("Invalid request: {0}")]
    Interval(#[from] IntervalError),
}

//! Metrics error types.

use thiserror::Error;

/// Result type alias for histogram operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors that can occur when addressing a histogram series.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("metric {metric} expects {expected} label values, got {got}")]
    LabelCardinality {
        metric: String,
        expected: usize,
        got: usize,
    },
}

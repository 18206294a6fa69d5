//! ic-query: error types for C9, C10.

use thiserror::Error;

pub type RecordIdResult<T> = Result<T, RecordIdError>;

/// C10 failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordIdError {
    #[error("record id is not valid base64url")]
    BadEncoding,
    #[error("record id is not valid utf-8")]
    BadUtf8,
    #[error("record id is missing the timestamp|unique_id separator")]
    MissingSeparator,
    #[error("record id has an empty timestamp or unique_id component")]
    EmptyComponent,
}

pub type QueryBuilderResult<T> = Result<T, QueryBuilderError>;

/// C9 failures, surfaced as 422 per §7.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryBuilderError {
    #[error("length must be between 1 and 100")]
    InvalidLength,
    #[error("direction must be \"next\" or \"prev\"")]
    InvalidDirection,
    #[error("cursor is not a valid RFC-3339 timestamp")]
    InvalidCursor,
    #[error("date range value is not in YYYY-MM-DD format")]
    InvalidDateFormat,
    #[error("range start is after range end")]
    StartAfterEnd,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Dependency-failure errors from the time-series backend, propagated as
/// 500-class per §7.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("time-series query timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("time-series transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("time-series response could not be parsed: {0}")]
    Parse(String),
}

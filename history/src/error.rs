//! History store error types.

use kursmon_common::{KursmonError, Timestamp};
use thiserror::Error;

/// Errors raised by history store backends.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Backend could not serve the request.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database driver error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Timestamp cannot be stored (outside 1677..2262 at nanosecond precision).
    #[error("Timestamp out of storable range: {0}")]
    TimestampOutOfRange(Timestamp),
}

impl From<HistoryError> for KursmonError {
    fn from(err: HistoryError) -> Self {
        KursmonError::StorageUnavailable(err.to_string())
    }
}

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

//! Error types for kursmon.

use crate::rate::CurrencyPair;
use thiserror::Error;

/// Main error type for a monitoring cycle.
#[derive(Error, Debug)]
pub enum KursmonError {
    /// Upstream source unreachable or unparseable.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Aggregation yielded nothing usable for a pair.
    #[error("No quotes found for {pair}")]
    NoQuotesFound { pair: CurrencyPair },

    /// History store operation failed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Outbound notification failed.
    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KursmonError {
    /// Check if this error is worth retrying on the next cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KursmonError::FetchFailed(_)
                | KursmonError::StorageUnavailable(_)
                | KursmonError::NotifyFailed(_)
        )
    }

    /// Stable error code for logs and callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            KursmonError::FetchFailed(_) => "FETCH_FAILED",
            KursmonError::NoQuotesFound { .. } => "NO_QUOTES_FOUND",
            KursmonError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            KursmonError::NotifyFailed(_) => "NOTIFY_FAILED",
            KursmonError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for kursmon operations.
pub type Result<T> = std::result::Result<T, KursmonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = KursmonError::NoQuotesFound {
            pair: CurrencyPair::RubKzt,
        };
        assert_eq!(err.error_code(), "NO_QUOTES_FOUND");
        assert_eq!(err.to_string(), "No quotes found for RUB_KZT");
        assert!(!err.is_retryable());

        assert!(KursmonError::NotifyFailed("timeout".into()).is_retryable());
        assert!(!KursmonError::Configuration("bad".into()).is_retryable());
    }
}

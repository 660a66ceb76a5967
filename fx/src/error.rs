//! FX error types.

use kursmon_common::{CurrencyPair, KursmonError};
use thiserror::Error;

/// Errors that can occur while fetching or aggregating quotes.
#[derive(Debug, Error)]
pub enum FxError {
    /// Upstream page could not be retrieved.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Upstream page did not contain a usable exchanger list.
    #[error("Malformed source payload: {0}")]
    Parse(String),

    /// No source published a valid quote for the pair.
    #[error("No quotes found for {0}")]
    NoQuotesFound(CurrencyPair),
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        FxError::Fetch(err.to_string())
    }
}

impl From<FxError> for KursmonError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::NoQuotesFound(pair) => KursmonError::NoQuotesFound { pair },
            other => KursmonError::FetchFailed(other.to_string()),
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_cycle_error() {
        let err: KursmonError = FxError::NoQuotesFound(CurrencyPair::UsdKzt).into();
        assert!(matches!(
            err,
            KursmonError::NoQuotesFound {
                pair: CurrencyPair::UsdKzt
            }
        ));

        let err: KursmonError = FxError::Parse("no punkts".into()).into();
        assert!(matches!(err, KursmonError::FetchFailed(_)));
    }
}

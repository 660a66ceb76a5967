//! Raw quote source trait and test double.

use std::sync::Arc;

use async_trait::async_trait;
use kursmon_common::SourceQuote;

use crate::error::FxResult;

/// A collaborator yielding the raw per-exchanger quote list.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the current quotes of every exchanger the source lists.
    async fn fetch_quotes(&self) -> FxResult<Vec<SourceQuote>>;
}

/// Shared quote source.
pub type SharedQuoteSource = Arc<dyn QuoteSource>;

/// Mock quote source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockQuoteSource {
    name: String,
    quotes: parking_lot::Mutex<Vec<SourceQuote>>,
    failure: parking_lot::Mutex<Option<String>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockQuoteSource {
    /// Create a new mock source returning no quotes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quotes: parking_lot::Mutex::new(Vec::new()),
            failure: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock source returning `quotes`.
    pub fn with_quotes(name: impl Into<String>, quotes: Vec<SourceQuote>) -> Self {
        let source = Self::new(name);
        source.set_quotes(quotes);
        source
    }

    /// Replace the quotes returned by subsequent fetches.
    pub fn set_quotes(&self, quotes: Vec<SourceQuote>) {
        *self.quotes.lock() = quotes;
    }

    /// Make subsequent fetches fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl QuoteSource for MockQuoteSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quotes(&self) -> FxResult<Vec<SourceQuote>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(message) = self.failure.lock().clone() {
            return Err(crate::error::FxError::Fetch(message));
        }
        Ok(self.quotes.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use kursmon_common::ExchangeQuote;

    #[tokio::test]
    async fn test_mock_source() {
        let source = MockQuoteSource::with_quotes(
            "test",
            vec![SourceQuote::new(
                "Exchanger 1",
                Some(ExchangeQuote::new(480.0, 485.0)),
                None,
            )],
        );

        let quotes = source.fetch_quotes().await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].source_name, "Exchanger 1");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_failure() {
        let source = MockQuoteSource::new("test");
        source.fail_with("connection refused");

        let result = source.fetch_quotes().await;
        assert!(matches!(result, Err(FxError::Fetch(_))));
    }
}

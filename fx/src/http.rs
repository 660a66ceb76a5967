//! HTTP-backed quote source.

use std::time::Duration;

use async_trait::async_trait;
use kursmon_common::SourceQuote;
use reqwest::Client;
use tracing::{debug, info, instrument};

use crate::error::{FxError, FxResult};
use crate::kurs::parse_punkts;
use crate::provider::QuoteSource;

/// Fetches the aggregator page and parses its exchanger list.
pub struct KursKzSource {
    client: Client,
    url: String,
}

impl KursKzSource {
    /// Create a source for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kursmon/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Page URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl QuoteSource for KursKzSource {
    fn name(&self) -> &str {
        "kurs.kz"
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_quotes(&self) -> FxResult<Vec<SourceQuote>> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::Fetch(format!("{} returned {}", self.url, status)));
        }

        let html = response.text().await?;
        debug!(bytes = html.len(), "Received aggregator page");

        let quotes = parse_punkts(&html)?;
        info!(sources = quotes.len(), "Fetched exchanger quotes");

        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_construction() {
        let source = KursKzSource::new("https://kurs.kz", Duration::from_secs(5)).unwrap();
        assert_eq!(source.url(), "https://kurs.kz");
        assert_eq!(source.name(), "kurs.kz");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        let source = KursKzSource::new("http://127.0.0.1:9/", Duration::from_millis(500)).unwrap();
        let result = source.fetch_quotes().await;
        assert!(matches!(result, Err(FxError::Fetch(_))));
    }
}

//! Kursmon FX
//!
//! Turns the exchanger list published by a rate aggregator page into one
//! canonical rate per currency pair.
//!
//! # Features
//!
//! - Quote source abstraction with an HTTP implementation
//! - Parser for the `var punkts = [...]` payload embedded in the page
//! - Outlier-trimmed aggregation (mean of the best N quotes per leg)
//!
//! # Example
//!
//! ```rust,ignore
//! use kursmon_fx::{KursKzSource, QuoteSource, RateAggregator};
//!
//! let source = KursKzSource::new("https://kurs.kz", std::time::Duration::from_secs(30))?;
//! let quotes = source.fetch_quotes().await?;
//! let rate = RateAggregator::new().aggregate(&quotes)?;
//! ```

pub mod aggregator;
pub mod error;
pub mod http;
pub mod kurs;
pub mod provider;

pub use aggregator::RateAggregator;
pub use error::{FxError, FxResult};
pub use http::KursKzSource;
pub use kurs::parse_punkts;
pub use provider::{QuoteSource, SharedQuoteSource};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockQuoteSource;

//! Exchange quote and canonical rate types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A currency pair tracked against the tenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyPair {
    /// US dollar to tenge.
    UsdKzt,
    /// Russian ruble to tenge.
    RubKzt,
}

impl CurrencyPair {
    /// All tracked pairs, in detection order.
    pub const ALL: [CurrencyPair; 2] = [CurrencyPair::UsdKzt, CurrencyPair::RubKzt];

    /// ISO 4217 code of the foreign (base) currency.
    pub fn base_code(&self) -> &'static str {
        match self {
            CurrencyPair::UsdKzt => "USD",
            CurrencyPair::RubKzt => "RUB",
        }
    }

    /// Human readable pair name.
    pub fn display_name(&self) -> &'static str {
        match self {
            CurrencyPair::UsdKzt => "USD → KZT",
            CurrencyPair::RubKzt => "RUB → KZT",
        }
    }

    /// Flag emoji used in notifications.
    pub fn emoji(&self) -> &'static str {
        match self {
            CurrencyPair::UsdKzt => "🇺🇸",
            CurrencyPair::RubKzt => "🇷🇺",
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_KZT", self.base_code())
    }
}

/// A buy/sell quote for one currency pair.
///
/// For raw source quotes `buy` is the price the exchanger pays for the
/// foreign currency and `sell` the price it charges. For canonical rates
/// `sell` is what the observer pays to acquire the currency and `buy` is
/// what the observer receives when disposing of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeQuote {
    pub buy: f64,
    pub sell: f64,
}

impl ExchangeQuote {
    /// Create a new quote.
    pub fn new(buy: f64, sell: f64) -> Self {
        Self { buy, sell }
    }

    /// Both legs are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.buy.is_finite() && self.sell.is_finite() && self.buy > 0.0 && self.sell > 0.0
    }
}

impl fmt::Display for ExchangeQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buy={:.2} sell={:.2}", self.buy, self.sell)
    }
}

/// The system's single authoritative rate for a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRate {
    pub usd_to_kzt: ExchangeQuote,
    pub rub_to_kzt: ExchangeQuote,
}

impl CanonicalRate {
    /// Create a canonical rate from both pair quotes.
    pub fn new(usd_to_kzt: ExchangeQuote, rub_to_kzt: ExchangeQuote) -> Self {
        Self {
            usd_to_kzt,
            rub_to_kzt,
        }
    }

    /// Quote for the given pair.
    pub fn quote(&self, pair: CurrencyPair) -> ExchangeQuote {
        match pair {
            CurrencyPair::UsdKzt => self.usd_to_kzt,
            CurrencyPair::RubKzt => self.rub_to_kzt,
        }
    }
}

/// Raw quotes published by one exchanger. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceQuote {
    /// Exchanger name as listed by the aggregator.
    pub source_name: String,
    pub usd: Option<ExchangeQuote>,
    pub rub: Option<ExchangeQuote>,
}

impl SourceQuote {
    /// Create a source quote.
    pub fn new(
        source_name: impl Into<String>,
        usd: Option<ExchangeQuote>,
        rub: Option<ExchangeQuote>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            usd,
            rub,
        }
    }

    /// Quote for the given pair, if the source published one.
    pub fn quote(&self, pair: CurrencyPair) -> Option<ExchangeQuote> {
        match pair {
            CurrencyPair::UsdKzt => self.usd,
            CurrencyPair::RubKzt => self.rub,
        }
    }
}

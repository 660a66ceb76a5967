//! Outlier-trimmed rate aggregation.
//!
//! The aggregator page lists every kiosk in town, including low-volume ones
//! with predatory or placeholder rates. For each pair the canonical rate
//! keeps only the best `top_count` offers on each leg:
//!
//! - `sell` (what the observer pays to buy the currency) is the mean of the
//!   lowest source `sell` values;
//! - `buy` (what the observer gets when selling it) is the mean of the
//!   highest source `buy` values.

use kursmon_common::{CanonicalRate, CurrencyPair, ExchangeQuote, SourceQuote};
use tracing::{debug, info};

use crate::error::{FxError, FxResult};

/// Turns raw per-source quotes into one canonical rate per pair.
#[derive(Debug, Clone)]
pub struct RateAggregator {
    top_count: usize,
}

impl RateAggregator {
    /// Number of best offers averaged per leg by default.
    pub const DEFAULT_TOP_COUNT: usize = 5;

    /// Create an aggregator with the default top count.
    pub fn new() -> Self {
        Self {
            top_count: Self::DEFAULT_TOP_COUNT,
        }
    }

    /// Set how many best offers are averaged per leg (at least one).
    pub fn with_top_count(mut self, top_count: usize) -> Self {
        self.top_count = top_count.max(1);
        self
    }

    /// Number of best offers averaged per leg.
    pub fn top_count(&self) -> usize {
        self.top_count
    }

    /// Aggregate both pairs. Fails if either pair has no valid quote.
    pub fn aggregate(&self, quotes: &[SourceQuote]) -> FxResult<CanonicalRate> {
        let usd_to_kzt = self.aggregate_pair(CurrencyPair::UsdKzt, quotes)?;
        let rub_to_kzt = self.aggregate_pair(CurrencyPair::RubKzt, quotes)?;

        info!(
            usd = %usd_to_kzt,
            rub = %rub_to_kzt,
            sources = quotes.len(),
            "Aggregated canonical rate"
        );

        Ok(CanonicalRate::new(usd_to_kzt, rub_to_kzt))
    }

    /// Aggregate a single pair.
    pub fn aggregate_pair(
        &self,
        pair: CurrencyPair,
        quotes: &[SourceQuote],
    ) -> FxResult<ExchangeQuote> {
        let mut buys = Vec::with_capacity(quotes.len());
        let mut sells = Vec::with_capacity(quotes.len());

        for source in quotes {
            match source.quote(pair) {
                Some(quote) if quote.is_valid() => {
                    buys.push(quote.buy);
                    sells.push(quote.sell);
                }
                Some(quote) => {
                    debug!(source = %source.source_name, pair = %pair, quote = %quote, "Discarding invalid quote");
                }
                None => {
                    debug!(source = %source.source_name, pair = %pair, "Source has no quote for pair");
                }
            }
        }

        if sells.is_empty() {
            return Err(FxError::NoQuotesFound(pair));
        }

        let sell = mean_of_lowest(&mut sells, self.top_count);
        let buy = mean_of_highest(&mut buys, self.top_count);

        debug!(
            pair = %pair,
            valid = sells.len(),
            top = self.top_count.min(sells.len()),
            buy,
            sell,
            "Aggregated pair"
        );

        Ok(ExchangeQuote::new(buy, sell))
    }
}

impl Default for RateAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean of the `n` smallest values. `values` must be non-empty.
fn mean_of_lowest(values: &mut [f64], n: usize) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    mean(&values[..n.min(values.len())])
}

/// Mean of the `n` largest values. `values` must be non-empty.
fn mean_of_highest(values: &mut [f64], n: usize) -> f64 {
    values.sort_by(|a, b| b.total_cmp(a));
    mean(&values[..n.min(values.len())])
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn usd_only(name: &str, buy: f64, sell: f64) -> SourceQuote {
        SourceQuote::new(
            name,
            Some(ExchangeQuote::new(buy, sell)),
            Some(ExchangeQuote::new(5.0, 5.2)),
        )
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_averages_best_five_per_leg() {
        let quotes: Vec<SourceQuote> = (0..7)
            .map(|i| {
                let i = i as f64;
                usd_only(&format!("p{i}"), 480.0 + i, 485.0 + i)
            })
            .collect();

        let rate = RateAggregator::new().aggregate(&quotes).unwrap();

        // Lowest sells: 485..=489, highest buys: 482..=486.
        assert_close(rate.usd_to_kzt.sell, 487.0);
        assert_close(rate.usd_to_kzt.buy, 484.0);
    }

    #[test]
    fn test_uses_all_when_fewer_than_top_count() {
        let quotes = vec![usd_only("a", 480.0, 486.0), usd_only("b", 482.0, 484.0)];

        let rate = RateAggregator::new().aggregate(&quotes).unwrap();

        assert_close(rate.usd_to_kzt.sell, 485.0);
        assert_close(rate.usd_to_kzt.buy, 481.0);
    }

    #[test]
    fn test_discards_zero_and_negative_quotes() {
        let quotes = vec![
            usd_only("zero-buy", 0.0, 400.0),
            usd_only("negative-sell", 480.0, -1.0),
            usd_only("ok", 481.0, 486.0),
        ];

        let rate = RateAggregator::new().aggregate(&quotes).unwrap();

        assert_close(rate.usd_to_kzt.sell, 486.0);
        assert_close(rate.usd_to_kzt.buy, 481.0);
    }

    #[test]
    fn test_tolerates_sources_missing_a_pair() {
        let quotes = vec![
            SourceQuote::new("usd-only", Some(ExchangeQuote::new(480.0, 485.0)), None),
            SourceQuote::new("rub-only", None, Some(ExchangeQuote::new(5.1, 5.3))),
        ];

        let rate = RateAggregator::new().aggregate(&quotes).unwrap();

        assert_close(rate.usd_to_kzt.sell, 485.0);
        assert_close(rate.rub_to_kzt.sell, 5.3);
    }

    #[test]
    fn test_no_quotes_for_pair() {
        let quotes = vec![
            SourceQuote::new("usd-only", Some(ExchangeQuote::new(480.0, 485.0)), None),
            SourceQuote::new("bad-rub", None, Some(ExchangeQuote::new(0.0, 0.0))),
        ];

        let result = RateAggregator::new().aggregate(&quotes);

        assert!(matches!(
            result,
            Err(FxError::NoQuotesFound(CurrencyPair::RubKzt))
        ));
    }

    #[test]
    fn test_empty_input() {
        let result = RateAggregator::new().aggregate(&[]);
        assert!(matches!(
            result,
            Err(FxError::NoQuotesFound(CurrencyPair::UsdKzt))
        ));
    }

    #[test]
    fn test_custom_top_count() {
        let quotes = vec![
            usd_only("a", 480.0, 484.0),
            usd_only("b", 479.0, 485.0),
            usd_only("c", 478.0, 490.0),
        ];

        let rate = RateAggregator::new().with_top_count(1).aggregate(&quotes).unwrap();
        assert_close(rate.usd_to_kzt.sell, 484.0);
        assert_close(rate.usd_to_kzt.buy, 480.0);

        assert_eq!(RateAggregator::new().with_top_count(0).top_count(), 1);
    }

    proptest! {
        #[test]
        fn prop_removing_low_sells_never_lowers_rate(
            mut sells in proptest::collection::vec(1.0f64..1000.0, 1..20)
        ) {
            sells.sort_by(|a, b| a.total_cmp(b));
            let aggregator = RateAggregator::new();
            let mut previous = f64::MIN;

            for removed in 0..sells.len() {
                let quotes: Vec<SourceQuote> = sells[removed..]
                    .iter()
                    .map(|sell| usd_only("p", sell * 0.99, *sell))
                    .collect();
                let sell = aggregator.aggregate_pair(CurrencyPair::UsdKzt, &quotes).unwrap().sell;
                prop_assert!(sell >= previous - 1e-9);
                previous = sell;
            }
        }

        #[test]
        fn prop_adding_higher_sell_never_lowers_rate(
            sells in proptest::collection::vec(1.0f64..1000.0, 1..20),
            extra in 0.0f64..500.0
        ) {
            let aggregator = RateAggregator::new();
            let mut quotes: Vec<SourceQuote> = sells
                .iter()
                .map(|sell| usd_only("p", sell * 0.99, *sell))
                .collect();
            let before = aggregator.aggregate_pair(CurrencyPair::UsdKzt, &quotes).unwrap().sell;

            let max = sells.iter().cloned().fold(f64::MIN, f64::max);
            quotes.push(usd_only("outlier", max, max + extra));
            let after = aggregator.aggregate_pair(CurrencyPair::UsdKzt, &quotes).unwrap().sell;

            prop_assert!(after >= before - 1e-9);
        }
    }
}

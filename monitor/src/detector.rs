//! Multi-window threshold detection.

use kursmon_common::{CanonicalRate, CurrencyPair, KursmonError, Result};
use kursmon_history::SharedHistoryStore;
use tracing::{debug, error, info, instrument, warn};

use crate::alert::{Alert, Direction};
use crate::thresholds::{ThresholdConfig, ThresholdTable};

/// Compares the current rate against a historical baseline per window.
///
/// Only the sell leg (what the observer pays for the currency) is compared.
pub struct ThresholdDetector {
    store: SharedHistoryStore,
    thresholds: ThresholdTable,
    strict: bool,
}

impl ThresholdDetector {
    pub fn new(store: SharedHistoryStore, thresholds: ThresholdTable) -> Self {
        Self {
            store,
            thresholds,
            strict: false,
        }
    }

    /// In strict mode `detect` fails when every window lookup failed.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Alerts for `current`, window-major then pair-major.
    ///
    /// Windows without a baseline are skipped. Lookup failures are logged
    /// and skip the window.
    #[instrument(skip_all)]
    pub async fn detect(&self, current: &CanonicalRate) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        let mut failed_lookups = 0usize;

        for threshold in self.thresholds.iter() {
            let window = threshold.window;

            let baseline = match self.store.nearest_before(window.duration()).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    debug!(window = %window, "No baseline for window yet");
                    continue;
                }
                Err(e) => {
                    failed_lookups += 1;
                    error!(window = %window, error = %e, "Baseline lookup failed");
                    continue;
                }
            };

            for pair in CurrencyPair::ALL {
                let old_rate = baseline.rate.quote(pair).sell;
                let new_rate = current.quote(pair).sell;

                if !old_rate.is_finite() || old_rate <= 0.0 {
                    warn!(window = %window, pair = %pair, old_rate, "Skipping non-positive baseline");
                    continue;
                }

                if let Some(alert) = evaluate(threshold, pair, old_rate, new_rate) {
                    info!(
                        window = %window,
                        pair = %pair,
                        level = ?alert.level,
                        change_percent = alert.change_percent,
                        "Threshold crossed"
                    );
                    alerts.push(alert);
                }
            }
        }

        if self.strict && failed_lookups > 0 && failed_lookups == self.thresholds.len() {
            return Err(KursmonError::StorageUnavailable(format!(
                "all {failed_lookups} baseline lookups failed"
            )));
        }

        Ok(alerts)
    }
}

/// Signed percentage change from `old_rate` to `new_rate`.
pub fn change_percent(old_rate: f64, new_rate: f64) -> f64 {
    (new_rate - old_rate) * 100.0 / old_rate
}

/// Alert for one (window, pair), if the change reaches a threshold.
pub fn evaluate(
    threshold: &ThresholdConfig,
    pair: CurrencyPair,
    old_rate: f64,
    new_rate: f64,
) -> Option<Alert> {
    let change = change_percent(old_rate, new_rate);
    let level = threshold.classify(change)?;

    Some(Alert {
        level,
        window: threshold.window,
        pair,
        direction: Direction::of(change),
        change_percent: change,
        old_rate,
        new_rate,
    })
}

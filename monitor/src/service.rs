//! The monitoring cycle.

use std::sync::Arc;

use kursmon_common::{CanonicalRate, HistoryRecord, KursmonError, Result, SharedClock};
use kursmon_fx::{RateAggregator, SharedQuoteSource};
use kursmon_history::SharedHistoryStore;
use serde::Serialize;
use tracing::{debug, error, info, info_span, instrument, Instrument};
use uuid::Uuid;

use crate::alert::Alert;
use crate::config::MonitorConfig;
use crate::detector::ThresholdDetector;
use crate::formatter::AlertFormatter;
use crate::metrics::{Metrics, SharedMetrics};
use crate::notifier::SharedNotifier;
use crate::thresholds::ThresholdTable;

/// Parameters of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRequest {
    /// Notification destination (chat id).
    pub destination: String,
    /// Notify even when no threshold was crossed.
    pub force_notify: bool,
    /// Store the aggregated rate in history.
    pub persist: bool,
}

impl CycleRequest {
    /// Scheduled run: persist, notify only on alerts.
    pub fn scheduled(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            force_notify: false,
            persist: true,
        }
    }

    /// Manual run: always notify, leave history untouched.
    pub fn manual(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            force_notify: true,
            persist: false,
        }
    }
}

/// Outcome of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub rate: CanonicalRate,
    pub alerts: Vec<Alert>,
    /// The rate was written to history.
    pub persisted: bool,
    /// A message was delivered.
    pub notified: bool,
    /// Records removed by retention pruning, `None` if pruning failed.
    pub pruned: Option<u64>,
}

/// Drives fetch, aggregate, persist, detect, notify and prune.
pub struct MonitorService {
    source: SharedQuoteSource,
    aggregator: RateAggregator,
    store: SharedHistoryStore,
    detector: ThresholdDetector,
    formatter: AlertFormatter,
    notifier: SharedNotifier,
    clock: SharedClock,
    metrics: SharedMetrics,
    default_destination: String,
    retention_days: u32,
}

impl MonitorService {
    /// Create a service with the default threshold table, top count and
    /// retention.
    pub fn new(
        source: SharedQuoteSource,
        store: SharedHistoryStore,
        notifier: SharedNotifier,
        clock: SharedClock,
    ) -> Self {
        let detector = ThresholdDetector::new(store.clone(), ThresholdTable::default());

        Self {
            source,
            aggregator: RateAggregator::new(),
            store,
            detector,
            formatter: AlertFormatter::new(),
            notifier,
            clock,
            metrics: Arc::new(Metrics::new()),
            default_destination: String::new(),
            retention_days: kursmon_common::constants::RETENTION_DAYS,
        }
    }

    /// Create a service wired from configuration.
    pub fn from_config(
        config: &MonitorConfig,
        source: SharedQuoteSource,
        store: SharedHistoryStore,
        notifier: SharedNotifier,
        clock: SharedClock,
    ) -> Self {
        Self::new(source, store, notifier, clock)
            .with_aggregator(RateAggregator::new().with_top_count(config.source.top_count))
            .with_thresholds(config.thresholds.clone())
            .with_retention_days(config.history.retention_days)
            .with_default_destination(config.telegram.chat_id.clone())
    }

    pub fn with_aggregator(mut self, aggregator: RateAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        let strict = self.detector.is_strict();
        self.detector = ThresholdDetector::new(self.store.clone(), thresholds).with_strict(strict);
        self
    }

    pub fn with_strict_detection(mut self, strict: bool) -> Self {
        self.detector = self.detector.with_strict(strict);
        self
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Destination used when a trigger does not name one.
    pub fn with_default_destination(mut self, destination: impl Into<String>) -> Self {
        self.default_destination = destination.into();
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn default_destination(&self) -> &str {
        &self.default_destination
    }

    /// Run one cycle.
    ///
    /// Fails only when fetching/aggregating or notifying fails. Persistence,
    /// detection and pruning failures are logged and the cycle continues.
    pub async fn run_cycle(&self, request: &CycleRequest) -> Result<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!(
            "cycle",
            %cycle_id,
            persist = request.persist,
            force_notify = request.force_notify
        );

        self.execute(request).instrument(span).await
    }

    /// Scheduled cycle. Failures are logged, not returned.
    pub async fn run_scheduled(&self, destination: &str) -> Option<CycleReport> {
        match self.run_cycle(&CycleRequest::scheduled(destination)).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Scheduled cycle failed");
                None
            }
        }
    }

    /// Manual cycle, always notifying `destination` (or the default one).
    pub async fn trigger(&self, destination: Option<&str>) -> Result<CycleReport> {
        let destination = destination
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(self.default_destination.as_str());

        if destination.is_empty() {
            return Err(KursmonError::Configuration(
                "no notification destination".to_string(),
            ));
        }

        info!(destination, "Manual trigger");
        self.run_cycle(&CycleRequest::manual(destination)).await
    }

    /// Most recent stored rate.
    pub async fn latest_record(&self) -> Result<Option<HistoryRecord>> {
        Ok(self.store.latest().await?)
    }

    /// Full history, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.store.all().await?)
    }

    /// Remove every stored rate. Returns the number removed.
    #[instrument(skip(self))]
    pub async fn clear_history(&self) -> Result<u64> {
        let deleted = self.store.delete_all().await?;
        info!(deleted, "History cleared");
        Ok(deleted)
    }

    async fn execute(&self, request: &CycleRequest) -> Result<CycleReport> {
        self.metrics.cycle_started();
        info!("Starting monitoring cycle");

        let rate = match self.fetch_rate().await {
            Ok(rate) => rate,
            Err(e) => {
                self.metrics.fetch_failed();
                self.metrics.cycle_failed();
                error!(error = %e, "Failed to obtain canonical rate");
                return Err(e);
            }
        };

        let persisted = request.persist && self.persist(&rate).await;

        let alerts = match self.detector.detect(&rate).await {
            Ok(alerts) => alerts,
            Err(e) => {
                self.metrics.detect_failed();
                error!(error = %e, "Threshold detection failed, continuing without alerts");
                Vec::new()
            }
        };
        self.metrics.alerts_emitted(&alerts);

        let notified = self.notify(request, &rate, &alerts).await;

        let pruned = match self.store.delete_older_than(self.retention_days).await {
            Ok(count) => {
                self.metrics.records_pruned(count);
                Some(count)
            }
            Err(e) => {
                self.metrics.prune_failed();
                error!(error = %e, retention_days = self.retention_days, "Failed to prune history");
                None
            }
        };

        match notified {
            Ok(notified) => {
                self.metrics.cycle_succeeded();
                info!(alerts = alerts.len(), persisted, notified, "Monitoring cycle complete");
                Ok(CycleReport {
                    rate,
                    alerts,
                    persisted,
                    notified,
                    pruned,
                })
            }
            Err(e) => {
                self.metrics.cycle_failed();
                Err(e)
            }
        }
    }

    async fn fetch_rate(&self) -> Result<CanonicalRate> {
        let quotes = self.source.fetch_quotes().await?;
        debug!(source = self.source.name(), sources = quotes.len(), "Fetched quotes");
        Ok(self.aggregator.aggregate(&quotes)?)
    }

    async fn persist(&self, rate: &CanonicalRate) -> bool {
        match self.store.insert(rate, self.clock.now()).await {
            Ok(()) => true,
            Err(e) => {
                self.metrics.persist_failed();
                error!(error = %e, "Failed to save rate to history, continuing");
                false
            }
        }
    }

    async fn notify(
        &self,
        request: &CycleRequest,
        rate: &CanonicalRate,
        alerts: &[Alert],
    ) -> Result<bool> {
        if alerts.is_empty() && !request.force_notify {
            debug!("No thresholds crossed, skipping notification");
            return Ok(false);
        }

        let text = self.formatter.format(rate, alerts);
        match self.notifier.send(&request.destination, &text).await {
            Ok(()) => {
                self.metrics.notification_sent();
                Ok(true)
            }
            Err(e) => {
                self.metrics.notification_failed();
                error!(error = %e, destination = %request.destination, "Failed to send notification");
                Err(e)
            }
        }
    }
}

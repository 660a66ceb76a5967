//! Cycle metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::alert::{Alert, AlertLevel};

/// Monitor metrics.
pub struct Metrics {
    /// Cycles started.
    pub cycles_started: AtomicU64,
    /// Cycles that returned success.
    pub cycles_succeeded: AtomicU64,
    /// Cycles that returned an error.
    pub cycles_failed: AtomicU64,
    /// Fetch or aggregation failures.
    pub fetch_failures: AtomicU64,
    /// Swallowed persistence failures.
    pub persist_failures: AtomicU64,
    /// Swallowed detection failures.
    pub detect_failures: AtomicU64,
    /// Swallowed pruning failures.
    pub prune_failures: AtomicU64,
    /// Warning alerts emitted.
    pub warning_alerts: AtomicU64,
    /// Critical alerts emitted.
    pub critical_alerts: AtomicU64,
    /// Notifications delivered.
    pub notifications_sent: AtomicU64,
    /// Notifications that failed.
    pub notifications_failed: AtomicU64,
    /// History records pruned.
    pub records_pruned: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            cycles_succeeded: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            detect_failures: AtomicU64::new(0),
            prune_failures: AtomicU64::new(0),
            warning_alerts: AtomicU64::new(0),
            critical_alerts: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            records_pruned: AtomicU64::new(0),
        }
    }

    pub fn cycle_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycle_succeeded(&self) {
        self.cycles_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycle_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn persist_failed(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detect_failed(&self) {
        self.detect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn prune_failed(&self) {
        self.prune_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Count emitted alerts by level.
    pub fn alerts_emitted(&self, alerts: &[Alert]) {
        for alert in alerts {
            match alert.level {
                AlertLevel::Warning => self.warning_alerts.fetch_add(1, Ordering::Relaxed),
                AlertLevel::Critical => self.critical_alerts.fetch_add(1, Ordering::Relaxed),
            };
        }
    }

    pub fn notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notification_failed(&self) {
        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_pruned(&self, count: u64) {
        self.records_pruned.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_succeeded: self.cycles_succeeded.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            detect_failures: self.detect_failures.load(Ordering::Relaxed),
            prune_failures: self.prune_failures.load(Ordering::Relaxed),
            warning_alerts: self.warning_alerts.load(Ordering::Relaxed),
            critical_alerts: self.critical_alerts.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            records_pruned: self.records_pruned.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters: [(&str, &str, u64); 12] = [
            ("cycles_started", "Monitoring cycles started", snapshot.cycles_started),
            ("cycles_succeeded", "Monitoring cycles that succeeded", snapshot.cycles_succeeded),
            ("cycles_failed", "Monitoring cycles that failed", snapshot.cycles_failed),
            ("fetch_failures", "Quote fetch or aggregation failures", snapshot.fetch_failures),
            ("persist_failures", "History insert failures", snapshot.persist_failures),
            ("detect_failures", "Threshold detection failures", snapshot.detect_failures),
            ("prune_failures", "History pruning failures", snapshot.prune_failures),
            ("warning_alerts", "Warning alerts emitted", snapshot.warning_alerts),
            ("critical_alerts", "Critical alerts emitted", snapshot.critical_alerts),
            ("notifications_sent", "Notifications delivered", snapshot.notifications_sent),
            ("notifications_failed", "Notifications that failed", snapshot.notifications_failed),
            ("records_pruned", "History records pruned", snapshot.records_pruned),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            out.push_str(&format!(
                "# HELP kursmon_{name} {help}\n# TYPE kursmon_{name} counter\nkursmon_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub fetch_failures: u64,
    pub persist_failures: u64,
    pub detect_failures: u64,
    pub prune_failures: u64,
    pub warning_alerts: u64,
    pub critical_alerts: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub records_pruned: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_increment() {
        let metrics = Metrics::new();

        metrics.cycle_started();
        metrics.cycle_started();
        metrics.cycle_succeeded();
        metrics.records_pruned(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cycles_started, 2);
        assert_eq!(snapshot.cycles_succeeded, 1);
        assert_eq!(snapshot.records_pruned, 7);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.cycle_started();

        let output = metrics.to_prometheus();
        assert!(output.contains("kursmon_cycles_started 1"));
        assert!(output.contains("# TYPE kursmon_records_pruned counter"));
    }
}

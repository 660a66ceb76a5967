//! Kursmon Monitor
//!
//! Threshold detection over the rate history, alert rendering and delivery,
//! and the monitoring cycle that ties the quote source, the history store
//! and the notifier together.

pub mod alert;
pub mod config;
pub mod detector;
pub mod formatter;
pub mod metrics;
pub mod notifier;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod thresholds;

pub use alert::{Alert, AlertLevel, Direction};
pub use config::MonitorConfig;
pub use detector::ThresholdDetector;
pub use formatter::AlertFormatter;
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use notifier::{Notifier, SharedNotifier, TelegramNotifier};
#[cfg(any(test, feature = "test-utils"))]
pub use notifier::RecordingNotifier;
pub use scheduler::Scheduler;
pub use service::{CycleReport, CycleRequest, MonitorService};
pub use state::SchedulerState;
pub use thresholds::{LookbackWindow, ThresholdConfig, ThresholdTable};

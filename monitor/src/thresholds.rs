//! Look-back windows and the threshold table.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::alert::AlertLevel;

/// How far back to search for a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookbackWindow {
    Hour,
    Day,
    Week,
    Month,
}

impl LookbackWindow {
    /// All windows, shortest first.
    pub const ALL: [LookbackWindow; 4] = [
        LookbackWindow::Hour,
        LookbackWindow::Day,
        LookbackWindow::Week,
        LookbackWindow::Month,
    ];

    /// Window length.
    pub fn duration(&self) -> Duration {
        match self {
            LookbackWindow::Hour => Duration::hours(1),
            LookbackWindow::Day => Duration::hours(24),
            LookbackWindow::Week => Duration::hours(168),
            LookbackWindow::Month => Duration::hours(720),
        }
    }

    /// Label used in notifications ("over the last {label}").
    pub fn label(&self) -> &'static str {
        match self {
            LookbackWindow::Hour => "hour",
            LookbackWindow::Day => "day",
            LookbackWindow::Week => "week",
            LookbackWindow::Month => "month",
        }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookbackWindow::Hour => "HOUR",
            LookbackWindow::Day => "DAY",
            LookbackWindow::Week => "WEEK",
            LookbackWindow::Month => "MONTH",
        };
        f.write_str(name)
    }
}

/// Warning and critical thresholds for one window, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub window: LookbackWindow,
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl ThresholdConfig {
    pub fn new(window: LookbackWindow, warning_percent: f64, critical_percent: f64) -> Self {
        Self {
            window,
            warning_percent,
            critical_percent,
        }
    }

    /// Level reached by a signed percentage change, if any. Critical
    /// supersedes warning; both bounds are inclusive.
    pub fn classify(&self, change_percent: f64) -> Option<AlertLevel> {
        let magnitude = change_percent.abs();
        if magnitude >= self.critical_percent {
            Some(AlertLevel::Critical)
        } else if magnitude >= self.warning_percent {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }

    /// Check `0 < warning < critical`.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.warning_percent.is_finite() && self.critical_percent.is_finite()) {
            return Err(format!("{} thresholds must be finite", self.window));
        }
        if self.warning_percent <= 0.0 {
            return Err(format!("{} warning threshold must be positive", self.window));
        }
        if self.warning_percent >= self.critical_percent {
            return Err(format!(
                "{} warning threshold ({}) must be below critical ({})",
                self.window, self.warning_percent, self.critical_percent
            ));
        }
        Ok(())
    }
}

/// Immutable set of thresholds, at most one row per window.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    rows: Vec<ThresholdConfig>,
}

impl ThresholdTable {
    /// Build a validated table. Rows are evaluated in the given order.
    pub fn new(rows: Vec<ThresholdConfig>) -> Result<Self, String> {
        let table = Self { rows };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rows.is_empty() {
            return Err("Threshold table cannot be empty".to_string());
        }

        for (i, row) in self.rows.iter().enumerate() {
            row.validate()?;
            if self.rows[..i].iter().any(|other| other.window == row.window) {
                return Err(format!("Duplicate threshold row for {}", row.window));
            }
        }

        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThresholdConfig> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `window`, if configured.
    pub fn get(&self, window: LookbackWindow) -> Option<&ThresholdConfig> {
        self.rows.iter().find(|row| row.window == window)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            rows: vec![
                ThresholdConfig::new(LookbackWindow::Hour, 0.5, 1.0),
                ThresholdConfig::new(LookbackWindow::Day, 1.0, 2.0),
                ThresholdConfig::new(LookbackWindow::Week, 2.0, 4.0),
                ThresholdConfig::new(LookbackWindow::Month, 3.0, 5.0),
            ],
        }
    }
}

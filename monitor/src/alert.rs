//! Alert value types.

use kursmon_common::CurrencyPair;
use serde::{Deserialize, Serialize};

use crate::thresholds::LookbackWindow;

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Warning,
    Critical,
}

/// Direction of a rate move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// `Up` for a strictly positive change, `Down` otherwise.
    pub fn of(change_percent: f64) -> Self {
        if change_percent > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Direction::Up => "📈",
            Direction::Down => "📉",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Up => "rose",
            Direction::Down => "fell",
        }
    }
}

/// A threshold crossing for one (window, pair). Lives for one cycle only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub window: LookbackWindow,
    pub pair: CurrencyPair,
    pub direction: Direction,
    /// Signed change of the sell leg, in percent.
    pub change_percent: f64,
    /// Baseline sell rate.
    pub old_rate: f64,
    /// Current sell rate.
    pub new_rate: f64,
}

impl Alert {
    pub fn is_critical(&self) -> bool {
        self.level == AlertLevel::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_of_change() {
        assert_eq!(Direction::of(0.7), Direction::Up);
        assert_eq!(Direction::of(-0.7), Direction::Down);
        assert_eq!(Direction::of(0.0), Direction::Down);
    }
}

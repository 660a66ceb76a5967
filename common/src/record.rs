//! Persisted history record.

use serde::{Deserialize, Serialize};

use crate::rate::CanonicalRate;
use crate::time::Timestamp;

/// A canonical rate observed at a point in time. Immutable once written.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// When the rate was observed (UTC).
    pub timestamp: Timestamp,
    /// The observed rate.
    pub rate: CanonicalRate,
}

impl HistoryRecord {
    /// Create a new record.
    pub fn new(timestamp: Timestamp, rate: CanonicalRate) -> Self {
        Self { timestamp, rate }
    }
}

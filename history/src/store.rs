//! History store contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use kursmon_common::{CanonicalRate, HistoryRecord, Timestamp};

use crate::error::HistoryResult;

/// Durable, time-ordered store of canonical rates.
///
/// Implementations must tolerate concurrent inserts and reads. Duplicate
/// timestamps are distinct records; among equal timestamps the most
/// recently inserted record sorts first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a record. Never overwrites.
    async fn insert(&self, rate: &CanonicalRate, timestamp: Timestamp) -> HistoryResult<()>;

    /// The record with the largest timestamp `<= now - lookback`, if any.
    ///
    /// This is "closest from below", not closest in absolute time: a
    /// baseline must be at least `lookback` old.
    async fn nearest_before(&self, lookback: Duration) -> HistoryResult<Option<HistoryRecord>>;

    /// The record with the largest timestamp, if any.
    async fn latest(&self) -> HistoryResult<Option<HistoryRecord>>;

    /// Every record, newest first.
    async fn all(&self) -> HistoryResult<Vec<HistoryRecord>>;

    /// Remove records with `timestamp <= now - days`. Returns the number removed.
    async fn delete_older_than(&self, days: u32) -> HistoryResult<u64>;

    /// Remove every record. Returns the number removed.
    async fn delete_all(&self) -> HistoryResult<u64>;
}

/// Shared history store.
pub type SharedHistoryStore = Arc<dyn HistoryStore>;

//! In-memory history store for tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Duration;
use kursmon_common::{CanonicalRate, HistoryRecord, SharedClock, Timestamp};
use parking_lot::RwLock;

use crate::error::{HistoryError, HistoryResult};
use crate::store::HistoryStore;

/// History store kept in a vector, with switchable failures.
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
    clock: SharedClock,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            clock,
            fail_inserts: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make `insert` fail.
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make `nearest_before`, `latest` and `all` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `delete_older_than` and `delete_all` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check(flag: &AtomicBool, operation: &str) -> HistoryResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(HistoryError::StorageUnavailable(format!(
                "injected {operation} failure"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn insert(&self, rate: &CanonicalRate, timestamp: Timestamp) -> HistoryResult<()> {
        Self::check(&self.fail_inserts, "insert")?;
        self.records.write().push(HistoryRecord::new(timestamp, *rate));
        Ok(())
    }

    async fn nearest_before(&self, lookback: Duration) -> HistoryResult<Option<HistoryRecord>> {
        Self::check(&self.fail_reads, "read")?;
        let target = self.clock.now() - lookback;

        // max_by_key keeps the last maximum, i.e. the newest insert on ties.
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.timestamp <= target)
            .max_by_key(|r| r.timestamp)
            .copied())
    }

    async fn latest(&self) -> HistoryResult<Option<HistoryRecord>> {
        Self::check(&self.fail_reads, "read")?;
        Ok(self
            .records
            .read()
            .iter()
            .max_by_key(|r| r.timestamp)
            .copied())
    }

    async fn all(&self) -> HistoryResult<Vec<HistoryRecord>> {
        Self::check(&self.fail_reads, "read")?;
        let mut records: Vec<HistoryRecord> = self.records.read().iter().rev().copied().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn delete_older_than(&self, days: u32) -> HistoryResult<u64> {
        Self::check(&self.fail_deletes, "delete")?;
        let cutoff = self.clock.now() - Duration::days(i64::from(days));

        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.timestamp > cutoff);
        Ok((before - records.len()) as u64)
    }

    async fn delete_all(&self) -> HistoryResult<u64> {
        Self::check(&self.fail_deletes, "delete")?;
        let mut records = self.records.write();
        let deleted = records.len() as u64;
        records.clear();
        Ok(deleted)
    }
}

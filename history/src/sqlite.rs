//! SQLite-backed history store.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use kursmon_common::{CanonicalRate, ExchangeQuote, HistoryRecord, SharedClock, Timestamp};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, instrument};

use crate::error::{HistoryError, HistoryResult};
use crate::store::HistoryStore;

/// Path value selecting a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

const SELECT_COLUMNS: &str = "SELECT timestamp, usd_buy, usd_sell, rub_buy, rub_sell FROM currency_history";

/// History store persisted in a single SQLite table.
///
/// Timestamps are stored as UTC unix nanoseconds so comparisons against
/// the clock are exact. SQLite's single-writer lock serializes concurrent
/// inserts.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    location: String,
    clock: SharedClock,
}

impl fmt::Debug for SqliteHistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteHistoryStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl SqliteHistoryStore {
    /// Open (or create) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub async fn open(path: impl AsRef<Path>, clock: SharedClock) -> HistoryResult<Self> {
        let path = path.as_ref();
        if path.as_os_str() == IN_MEMORY_PATH {
            return Self::in_memory(clock).await;
        }

        info!(path = %path.display(), "Opening history database");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HistoryError::Database(sqlx::Error::Io(e)))?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(StdDuration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(connect_options)
            .await?;

        let store = Self {
            pool,
            location: PathBuf::from(path).display().to_string(),
            clock,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the
    /// pool is pinned to one connection that is never recycled.
    pub async fn in_memory(clock: SharedClock) -> HistoryResult<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let store = Self {
            pool,
            location: IN_MEMORY_PATH.to_string(),
            clock,
        };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Where the database lives (file path or `:memory:`).
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Total number of stored records.
    pub async fn count(&self) -> HistoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM currency_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn initialize_schema(&self) -> HistoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS currency_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                usd_buy REAL NOT NULL,
                usd_sell REAL NOT NULL,
                rub_buy REAL NOT NULL,
                rub_sell REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_currency_history_timestamp ON currency_history(timestamp)",
        )
        .execute(&self.pool)
        .await?;

        info!(location = %self.location, "History schema initialized");
        Ok(())
    }

    /// Stored-form cutoff for `now - lookback`, saturating at the ends of
    /// the storable range.
    fn cutoff(&self, lookback: Duration) -> i64 {
        match self.clock.now().checked_sub_signed(lookback) {
            Some(at) => at
                .timestamp_nanos_opt()
                .unwrap_or(if at.timestamp() > 0 { i64::MAX } else { i64::MIN }),
            None => i64::MIN,
        }
    }
}

fn to_stored(timestamp: Timestamp) -> HistoryResult<i64> {
    timestamp
        .timestamp_nanos_opt()
        .ok_or(HistoryError::TimestampOutOfRange(timestamp))
}

fn record_from_row(row: &SqliteRow) -> HistoryResult<HistoryRecord> {
    let nanos: i64 = row.try_get("timestamp")?;
    let timestamp = Utc.timestamp_nanos(nanos);

    let rate = CanonicalRate::new(
        ExchangeQuote::new(row.try_get("usd_buy")?, row.try_get("usd_sell")?),
        ExchangeQuote::new(row.try_get("rub_buy")?, row.try_get("rub_sell")?),
    );

    Ok(HistoryRecord::new(timestamp, rate))
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    #[instrument(skip(self, rate))]
    async fn insert(&self, rate: &CanonicalRate, timestamp: Timestamp) -> HistoryResult<()> {
        let stored = to_stored(timestamp)?;

        sqlx::query(
            "INSERT INTO currency_history (timestamp, usd_buy, usd_sell, rub_buy, rub_sell) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(stored)
        .bind(rate.usd_to_kzt.buy)
        .bind(rate.usd_to_kzt.sell)
        .bind(rate.rub_to_kzt.buy)
        .bind(rate.rub_to_kzt.sell)
        .execute(&self.pool)
        .await?;

        debug!("Saved rate to history");
        Ok(())
    }

    async fn nearest_before(&self, lookback: Duration) -> HistoryResult<Option<HistoryRecord>> {
        let target = self.cutoff(lookback);

        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE timestamp <= ? ORDER BY timestamp DESC, id DESC LIMIT 1"
        ))
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let record = record_from_row(&row)?;
                debug!(lookback_secs = lookback.num_seconds(), found = %record.timestamp, "Found baseline record");
                Ok(Some(record))
            }
            None => {
                debug!(lookback_secs = lookback.num_seconds(), "No record old enough");
                Ok(None)
            }
        }
    }

    async fn latest(&self) -> HistoryResult<Option<HistoryRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn all(&self) -> HistoryResult<Vec<HistoryRecord>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC"))
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<HistoryResult<Vec<_>>>()?;

        debug!(count = records.len(), "Fetched history records");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn delete_older_than(&self, days: u32) -> HistoryResult<u64> {
        let cutoff = self.cutoff(Duration::days(i64::from(days)));

        let deleted = sqlx::query("DELETE FROM currency_history WHERE timestamp <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted > 0 {
            info!(deleted, "Pruned old history records");
        } else {
            debug!("No history records to prune");
        }
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn delete_all(&self) -> HistoryResult<u64> {
        let deleted = sqlx::query("DELETE FROM currency_history")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(deleted, "Deleted all history records");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kursmon_common::{Clock, ManualClock};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn rate(usd_sell: f64) -> CanonicalRate {
        CanonicalRate::new(
            ExchangeQuote::new(usd_sell - 5.0, usd_sell),
            ExchangeQuote::new(5.1, 5.3),
        )
    }

    async fn setup() -> (SqliteHistoryStore, Arc<ManualClock>) {
        let clock = ManualClock::shared(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        let store = SqliteHistoryStore::in_memory(clock.clone()).await.unwrap();
        (store, clock)
    }

    #[tokio::test]
    async fn test_nearest_before_takes_freshest_qualifying_record() {
        let (store, clock) = setup().await;
        let now = clock.now();

        store.insert(&rate(470.0), now - Duration::hours(10)).await.unwrap();
        store.insert(&rate(476.0), now - Duration::hours(6)).await.unwrap();
        store.insert(&rate(478.0), now - Duration::hours(4)).await.unwrap();

        let record = store.nearest_before(Duration::hours(5)).await.unwrap().unwrap();

        assert_eq!(record.timestamp, now - Duration::hours(6));
        assert_eq!(record.rate.usd_to_kzt.sell, 476.0);
    }

    #[tokio::test]
    async fn test_nearest_before_includes_exact_boundary() {
        let (store, clock) = setup().await;
        let now = clock.now();

        store.insert(&rate(480.0), now - Duration::hours(1)).await.unwrap();

        let record = store.nearest_before(Duration::hours(1)).await.unwrap();
        assert_eq!(record.map(|r| r.timestamp), Some(now - Duration::hours(1)));
    }

    #[tokio::test]
    async fn test_nearest_before_none() {
        let (store, clock) = setup().await;

        assert!(store.nearest_before(Duration::hours(1)).await.unwrap().is_none());

        let now = clock.now();
        store.insert(&rate(480.0), now - Duration::minutes(30)).await.unwrap();
        store.insert(&rate(481.0), now).await.unwrap();

        assert!(store.nearest_before(Duration::hours(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nearest_before_follows_clock() {
        let (store, clock) = setup().await;
        let inserted_at = clock.now();
        store.insert(&rate(480.0), inserted_at).await.unwrap();

        assert!(store.nearest_before(Duration::hours(1)).await.unwrap().is_none());

        clock.advance(Duration::hours(1));
        let record = store.nearest_before(Duration::hours(1)).await.unwrap();
        assert_eq!(record.map(|r| r.timestamp), Some(inserted_at));
    }

    #[tokio::test]
    async fn test_sub_millisecond_precision_is_kept() {
        let (store, clock) = setup().await;
        clock.set(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::microseconds(500));
        let target = clock.now() - Duration::hours(1);

        store.insert(&rate(480.0), target - Duration::microseconds(200)).await.unwrap();
        store.insert(&rate(481.0), target + Duration::microseconds(200)).await.unwrap();

        let record = store.nearest_before(Duration::hours(1)).await.unwrap().unwrap();
        assert_eq!(record.timestamp, target - Duration::microseconds(200));
        assert_eq!(record.rate.usd_to_kzt.sell, 480.0);

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.timestamp, target + Duration::microseconds(200));

        store.delete_all().await.unwrap();
        store.insert(&rate(481.0), target + Duration::microseconds(200)).await.unwrap();
        assert!(store.nearest_before(Duration::hours(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_older_than_is_exact_below_a_millisecond() {
        let (store, clock) = setup().await;
        clock.set(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::microseconds(500));
        let cutoff = clock.now() - Duration::days(30);

        store.insert(&rate(470.0), cutoff).await.unwrap();
        store.insert(&rate(471.0), cutoff + Duration::microseconds(300)).await.unwrap();

        assert_eq!(store.delete_older_than(30).await.unwrap(), 1);
        let remaining = store.all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].timestamp, cutoff + Duration::microseconds(300));
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_rejected() {
        let (store, _clock) = setup().await;
        let far_future = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();

        let result = store.insert(&rate(480.0), far_future).await;
        assert!(matches!(result, Err(HistoryError::TimestampOutOfRange(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_debug_shows_location() {
        let (store, _clock) = setup().await;
        assert!(format!("{store:?}").contains(IN_MEMORY_PATH));
    }

    #[tokio::test]
    async fn test_duplicate_timestamps_are_distinct() {
        let (store, clock) = setup().await;
        let at = clock.now() - Duration::hours(2);

        store.insert(&rate(480.0), at).await.unwrap();
        store.insert(&rate(481.0), at).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let record = store.nearest_before(Duration::hours(1)).await.unwrap().unwrap();
        assert_eq!(record.rate.usd_to_kzt.sell, 481.0);
    }

    #[tokio::test]
    async fn test_latest_and_all_ordering() {
        let (store, clock) = setup().await;
        let now = clock.now();

        assert!(store.latest().await.unwrap().is_none());
        assert!(store.all().await.unwrap().is_empty());

        store.insert(&rate(481.0), now - Duration::hours(1)).await.unwrap();
        store.insert(&rate(483.0), now).await.unwrap();
        store.insert(&rate(479.0), now - Duration::hours(3)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.rate.usd_to_kzt.sell, 483.0);

        let sells: Vec<f64> = store
            .all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.rate.usd_to_kzt.sell)
            .collect();
        assert_eq!(sells, vec![483.0, 481.0, 479.0]);
    }

    #[tokio::test]
    async fn test_round_trips_all_legs() {
        let (store, clock) = setup().await;
        let original = CanonicalRate::new(
            ExchangeQuote::new(484.25, 487.85),
            ExchangeQuote::new(5.12, 5.41),
        );

        store.insert(&original, clock.now()).await.unwrap();

        let record = store.latest().await.unwrap().unwrap();
        assert_eq!(record.rate, original);
        assert_eq!(record.timestamp, clock.now());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let (store, clock) = setup().await;
        let now = clock.now();

        store.insert(&rate(470.0), now - Duration::days(45)).await.unwrap();
        store.insert(&rate(471.0), now - Duration::days(30)).await.unwrap();
        store.insert(&rate(472.0), now - Duration::days(29)).await.unwrap();
        store.insert(&rate(473.0), now).await.unwrap();

        let deleted = store.delete_older_than(30).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        assert_eq!(store.delete_older_than(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_twice() {
        let (store, clock) = setup().await;
        store.insert(&rate(480.0), clock.now()).await.unwrap();
        store.insert(&rate(481.0), clock.now()).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.delete_all().await.unwrap(), 0);
        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_inserts() {
        let (store, clock) = setup().await;
        let store = Arc::new(store);
        let now = clock.now();

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(&rate(480.0 + i as f64), now - Duration::minutes(i))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let dir = std::env::temp_dir().join(format!("kursmon-history-{}", std::process::id()));
        let path = dir.join("history.db");
        let clock = ManualClock::shared(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());

        {
            let store = SqliteHistoryStore::open(&path, clock.clone()).await.unwrap();
            store.delete_all().await.unwrap();
            store.insert(&rate(480.0), clock.now()).await.unwrap();
            store.close().await;
        }

        let store = SqliteHistoryStore::open(&path, clock.clone()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        store.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_nearest_before_is_max_qualifying(
            ages_min in proptest::collection::vec(0i64..10_000, 0..12),
            lookback_min in 0i64..10_000
        ) {
            tokio_test::block_on(async {
                let (store, clock) = setup().await;
                let now = clock.now();

                for age in &ages_min {
                    store.insert(&rate(480.0), now - Duration::minutes(*age)).await.unwrap();
                }

                let found = store
                    .nearest_before(Duration::minutes(lookback_min))
                    .await
                    .unwrap()
                    .map(|r| r.timestamp);
                let expected = ages_min
                    .iter()
                    .filter(|age| **age >= lookback_min)
                    .min()
                    .map(|age| now - Duration::minutes(*age));

                assert_eq!(found, expected);
            });
        }
    }
}

//! Kursmon History Store
//!
//! Append-only time series of canonical rates with "nearest record at or
//! before" lookups for threshold baselines and retention pruning.

pub mod error;
pub mod store;
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use error::{HistoryError, HistoryResult};
pub use store::{HistoryStore, SharedHistoryStore};
pub use sqlite::SqliteHistoryStore;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryHistoryStore;

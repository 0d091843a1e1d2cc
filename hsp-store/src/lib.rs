//! Time-series store access for solver input preparation.
//!
//! # Architecture
//!
//! - [`TimeSeriesStore`] is the contract the pipeline consumes: range,
//!   latest-before and metadata lookups keyed by external id. Stores may
//!   return a subset of the requested ids; missing ids mean "no data".
//! - [`SqliteStore`] is a local implementation backed by an in-memory SQLite
//!   database, loaded from CSV exports (see [`schema::create_schema`]).
//! - [`RetryingStore`] wraps any store and retries transient failures with
//!   a doubling delay.
//! - [`merge`] turns raw store responses into hourly, gap-free series.
//!
//! # Usage
//!
//! ```rust
//! use hsp_store::{SqliteStore, TimeSeriesStore};
//!
//! let store = SqliteStore::new().unwrap();
//! store.load_datapoints("inflow,2024-01-01 00:00,12.5\ninflow,2024-01-01 01:00,13.0\n").unwrap();
//! store.load_metadata("EXTERNAL_ID,IS_STEP\ninflow,false\n").unwrap();
//!
//! let ids = vec!["inflow".to_string()];
//! let metadata = store.retrieve_metadata(&ids).unwrap();
//! assert!(!metadata["inflow"].is_step);
//! ```

pub mod error;
mod loader;
pub mod merge;
mod queries;
pub mod retry;
pub mod schema;

pub use error::{Result, StoreError};
pub use retry::{RetryPolicy, RetryingStore};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A raw value as stored: epoch milliseconds and value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Per-series metadata the pipeline needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    /// Hold-last-value semantics if true, linear interpolation otherwise.
    pub is_step: bool,
}

/// Read access to an external time-series store.
///
/// Every method may omit ids it knows nothing about.
pub trait TimeSeriesStore {
    /// Raw datapoints with `start_ms <= timestamp <= end_ms`, sorted ascending.
    fn retrieve_range(
        &self,
        ids: &[String],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BTreeMap<String, Vec<Datapoint>>>;

    /// The newest datapoint with `timestamp <= before_ms`.
    fn retrieve_latest(&self, ids: &[String], before_ms: i64) -> Result<BTreeMap<String, Datapoint>>;

    fn retrieve_metadata(&self, ids: &[String]) -> Result<BTreeMap<String, SeriesMetadata>>;
}

/// In-memory SQLite time-series store.
///
/// Cheaply cloneable (via `Rc`); single-threaded like the rest of the
/// pipeline.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Rc<RefCell<Connection>>,
}

impl SqliteStore {
    /// Create an empty store with the schema applied.
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::create_schema())?;
        Ok(Self {
            conn: Rc::new(RefCell::new(conn)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_creates_successfully() {
        assert!(SqliteStore::new().is_ok(), "Store should create without errors");
    }

    #[test]
    fn store_is_cloneable() {
        let store = SqliteStore::new().unwrap();
        let other = store.clone();
        store.load_datapoints("inflow,2024-01-01 00:00,1.0\n").unwrap();
        let ids = vec!["inflow".to_string()];
        let latest = other.retrieve_latest(&ids, i64::MAX).unwrap();
        assert_eq!(latest.len(), 1, "Clone should see same data via shared Rc");
    }

    #[test]
    fn store_starts_empty() {
        let store = SqliteStore::new().unwrap();
        let ids = vec!["inflow".to_string()];
        assert!(store.retrieve_range(&ids, 0, i64::MAX).unwrap().is_empty());
        assert!(store.retrieve_metadata(&ids).unwrap().is_empty());
    }
}

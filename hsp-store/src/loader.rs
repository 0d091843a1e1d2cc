//! CSV data loading functions for populating the in-memory store.
//!
//! # CSV Formats
//!
//! - **Datapoints** (no headers): `external_id,timestamp,value`, where the
//!   timestamp is RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or epoch milliseconds
//! - **Metadata** (has headers): `EXTERNAL_ID,IS_STEP`

use crate::error::{Result, StoreError};
use crate::{Datapoint, SeriesMetadata, SqliteStore};
use hsp_series::time::{parse_timestamp, to_millis};
use rusqlite::params;

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl SqliteStore {
    /// Load raw datapoints from CSV string.
    ///
    /// Rows with an empty id, an unparseable timestamp or a non-numeric or
    /// non-finite value are skipped. Returns the number of rows stored.
    ///
    /// # Example CSV
    /// ```text
    /// res1_inflow,2024-01-01 00:00,12.5
    /// res1_inflow,2024-01-01T01:00:00Z,13.0
    /// ```
    pub fn load_datapoints(&self, csv_data: &str) -> Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let external_id = r.get(0).unwrap_or("").trim();
            let timestamp = match r.get(1).map(parse_timestamp) {
                Some(Ok(ts)) => to_millis(ts),
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            let value: f64 = match r.get(2).unwrap_or("").trim().parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    skipped += 1;
                    continue;
                }
            };
            if external_id.is_empty() {
                skipped += 1;
                continue;
            }

            conn.execute(
                "INSERT OR REPLACE INTO datapoints (external_id, timestamp_ms, value)
                 VALUES (?1, ?2, ?3)",
                params![external_id, timestamp, value],
            )?;
            count += 1;
        }
        log::info!("loader: Loaded {} datapoints, skipped {} invalid", count, skipped);
        Ok(count)
    }

    /// Load series metadata from CSV string.
    ///
    /// # Example CSV
    /// ```text
    /// EXTERNAL_ID,IS_STEP
    /// res1_inflow,false
    /// spot_price,true
    /// ```
    pub fn load_metadata(&self, csv_data: &str) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0usize;
        for result in rdr.records() {
            let r = result?;
            let external_id = r.get(0).unwrap_or("").trim();
            let is_step = parse_flag(r.get(1).unwrap_or("")).ok_or_else(|| {
                StoreError::InvalidRecord(format!("bad IS_STEP value for '{}'", external_id))
            })?;
            self.set_metadata(external_id, SeriesMetadata { is_step })?;
            count += 1;
        }
        log::info!("loader: Loaded metadata for {} series", count);
        Ok(count)
    }

    /// Store datapoints for one series, replacing values at equal timestamps.
    pub fn insert_datapoints(&self, external_id: &str, datapoints: &[Datapoint]) -> Result<()> {
        let conn = self.conn.borrow();
        for point in datapoints {
            conn.execute(
                "INSERT OR REPLACE INTO datapoints (external_id, timestamp_ms, value)
                 VALUES (?1, ?2, ?3)",
                params![external_id, point.timestamp, point.value],
            )?;
        }
        Ok(())
    }

    pub fn set_metadata(&self, external_id: &str, metadata: SeriesMetadata) -> Result<()> {
        self.conn.borrow().execute(
            "INSERT OR REPLACE INTO timeseries (external_id, is_step) VALUES (?1, ?2)",
            params![external_id, metadata.is_step],
        )?;
        Ok(())
    }
}

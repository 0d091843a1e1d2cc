//! [`TimeSeriesStore`] queries against the SQLite tables.

use crate::error::Result;
use crate::{Datapoint, SeriesMetadata, SqliteStore, TimeSeriesStore};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

impl TimeSeriesStore for SqliteStore {
    fn retrieve_range(
        &self,
        ids: &[String],
        start_ms: i64,
        end_ms: i64,
    ) -> Result<BTreeMap<String, Vec<Datapoint>>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT timestamp_ms, value
             FROM datapoints
             WHERE external_id = ?1 AND timestamp_ms >= ?2 AND timestamp_ms <= ?3
             ORDER BY timestamp_ms",
        )?;
        let mut result = BTreeMap::new();
        for id in ids {
            let points = stmt
                .query_map(params![id, start_ms, end_ms], |row| {
                    Ok(Datapoint {
                        timestamp: row.get(0)?,
                        value: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if !points.is_empty() {
                result.insert(id.clone(), points);
            }
        }
        log::debug!(
            "query: retrieve_range returned data for {} of {} ids",
            result.len(),
            ids.len()
        );
        Ok(result)
    }

    fn retrieve_latest(&self, ids: &[String], before_ms: i64) -> Result<BTreeMap<String, Datapoint>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(
            "SELECT timestamp_ms, value
             FROM datapoints
             WHERE external_id = ?1 AND timestamp_ms <= ?2
             ORDER BY timestamp_ms DESC
             LIMIT 1",
        )?;
        let mut result = BTreeMap::new();
        for id in ids {
            let latest = stmt
                .query_row(params![id, before_ms], |row| {
                    Ok(Datapoint {
                        timestamp: row.get(0)?,
                        value: row.get(1)?,
                    })
                })
                .optional()?;
            if let Some(point) = latest {
                result.insert(id.clone(), point);
            }
        }
        Ok(result)
    }

    fn retrieve_metadata(&self, ids: &[String]) -> Result<BTreeMap<String, SeriesMetadata>> {
        let conn = self.conn.borrow();
        let mut stmt = conn.prepare("SELECT is_step FROM timeseries WHERE external_id = ?1")?;
        let mut result = BTreeMap::new();
        for id in ids {
            let is_step: Option<bool> = stmt.query_row(params![id], |row| row.get(0)).optional()?;
            if let Some(is_step) = is_step {
                result.insert(id.clone(), SeriesMetadata { is_step });
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Datapoint, SqliteStore, TimeSeriesStore};

    fn store() -> SqliteStore {
        let store = SqliteStore::new().unwrap();
        store
            .insert_datapoints(
                "a",
                &[
                    Datapoint { timestamp: 100, value: 1.0 },
                    Datapoint { timestamp: 200, value: 2.0 },
                    Datapoint { timestamp: 300, value: 3.0 },
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_retrieve_range_is_inclusive() {
        let ids = vec!["a".to_string(), "missing".to_string()];
        let ranges = store().retrieve_range(&ids, 200, 300).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(
            ranges["a"],
            vec![
                Datapoint { timestamp: 200, value: 2.0 },
                Datapoint { timestamp: 300, value: 3.0 }
            ]
        );
    }

    #[test]
    fn test_retrieve_latest_at_or_before() {
        let ids = vec!["a".to_string()];
        let store = store();
        assert_eq!(store.retrieve_latest(&ids, 250).unwrap()["a"].value, 2.0);
        assert_eq!(store.retrieve_latest(&ids, 200).unwrap()["a"].value, 2.0);
        assert!(store.retrieve_latest(&ids, 99).unwrap().is_empty());
    }
}

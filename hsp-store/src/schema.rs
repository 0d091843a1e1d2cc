//! SQL schema definitions for the in-memory store.

/// Returns the full SQL schema as a single batch string.
///
/// - `timeseries` - Series metadata (external id, step flag)
/// - `datapoints` - Raw values keyed by external id and epoch milliseconds
///
/// A datapoint does not require a `timeseries` row; series without metadata
/// are treated as step series by the merger.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS timeseries (
        external_id TEXT PRIMARY KEY,
        is_step INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS datapoints (
        external_id TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        value REAL NOT NULL,
        PRIMARY KEY (external_id, timestamp_ms)
    );
    CREATE INDEX IF NOT EXISTS idx_datapoints_id ON datapoints(external_id);
    "#
}

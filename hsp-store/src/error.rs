/// Error types for store access
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Timeout-class failure worth retrying
    #[error("Transient store failure: {0}")]
    Transient(String),

    /// SQLite query failed
    #[error("SQLite query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// A record could not be converted
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A timestamp returned by the store is out of range
    #[error(transparent)]
    Series(#[from] hsp_series::SeriesError),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

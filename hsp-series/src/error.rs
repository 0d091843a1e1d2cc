/// Error types for series operations
use chrono::NaiveDateTime;
use thiserror::Error;

/// Main error type for series, schedule and resampling operations
#[derive(Error, Debug, PartialEq)]
pub enum SeriesError {
    /// The data starts before the resolution schedule does
    #[error(
        "Datapoints start at {data_start}, before the resolution schedule starts at {schedule_start}"
    )]
    RangeViolation {
        data_start: NaiveDateTime,
        schedule_start: NaiveDateTime,
    },

    /// Aggregation was requested without any resolution schedule
    #[error("Resolution schedule is empty")]
    EmptySchedule,

    /// A resolution string could not be parsed
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// A timestamp could not be parsed or is out of range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Type alias for Results using SeriesError
pub type Result<T> = std::result::Result<T, SeriesError>;

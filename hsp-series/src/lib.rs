//! Time series primitives for hydropower solver input preparation.
//!
//! This crate holds everything that operates on raw series values without
//! knowing about the model tree or the time-series store:
//!
//! - [`series::Series`] - an ordered timestamp -> value map with the
//!   union / forward-fill / interpolation operations the pipeline relies on
//! - [`schedule`] - the piecewise resolution schedule and its collapse into
//!   contiguous constant-resolution ranges
//! - [`resample`] - the per-range resampling and aggregation engine
//! - [`time`] - timestamp conversions shared by the other crates

pub mod error;
pub mod resample;
pub mod schedule;
pub mod series;
pub mod time;

pub use error::{Result, SeriesError};
pub use resample::{resample, resample_and_aggregate, Aggregation, Datapoints};
pub use schedule::{find_resolution_ranges, ResolutionRange, ResolutionSchedule};
pub use series::Series;

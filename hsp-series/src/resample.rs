//! Variable-resolution resampling and aggregation.

use crate::error::{Result, SeriesError};
use crate::schedule::{find_resolution_ranges, ResolutionSchedule};
use crate::series::Series;
use crate::time::hourly_grid;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Values flowing through the pipeline: a single scalar or a series.
#[derive(Debug, Clone, PartialEq)]
pub enum Datapoints {
    Scalar(f64),
    Series(Series),
}

impl Datapoints {
    /// A scalar is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Datapoints::Scalar(_) => false,
            Datapoints::Series(series) => series.is_empty(),
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            Datapoints::Scalar(_) => None,
            Datapoints::Series(series) => Some(series),
        }
    }

    /// Apply `f` to the scalar or to every value of the series.
    pub fn map_values<F>(&self, f: F) -> Datapoints
    where
        F: Fn(f64) -> f64,
    {
        match self {
            Datapoints::Scalar(value) => Datapoints::Scalar(f(*value)),
            Datapoints::Series(series) => Datapoints::Series(series.map_values(f)),
        }
    }
}

impl From<Series> for Datapoints {
    fn from(series: Series) -> Self {
        Datapoints::Series(series)
    }
}

/// Aggregation applied to the values that fall into one output bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
    Std,
    Max,
    Min,
    Median,
    First,
    Last,
}

impl Aggregation {
    /// Aggregate a non-empty bin.
    pub fn aggregate(&self, values: &[f64]) -> f64 {
        let n = values.len() as f64;
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / n,
            Aggregation::Std => {
                if values.len() < 2 {
                    return 0.0;
                }
                let mean = values.iter().sum::<f64>() / n;
                let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                (squares / (n - 1.0)).sqrt()
            }
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregation::First => values[0],
            Aggregation::Last => values[values.len() - 1],
        }
    }
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "std" => Ok(Aggregation::Std),
            "max" => Ok(Aggregation::Max),
            "min" => Ok(Aggregation::Min),
            "median" => Ok(Aggregation::Median),
            "first" => Ok(Aggregation::First),
            "last" => Ok(Aggregation::Last),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Std => "std",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Median => "median",
            Aggregation::First => "first",
            Aggregation::Last => "last",
        };
        write!(f, "{name}")
    }
}

/// Parse a resolution string such as `"15min"`, `"1h"` or `"1D"` into minutes.
pub fn parse_resolution(resolution: &str) -> Result<u32> {
    let s = resolution.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let count: u32 = if digits.is_empty() {
        1
    } else {
        digits
            .parse()
            .map_err(|_| SeriesError::InvalidResolution(resolution.to_string()))?
    };
    let factor = match unit {
        "min" | "T" => 1,
        "h" | "H" => 60,
        "D" | "d" => 1440,
        _ => return Err(SeriesError::InvalidResolution(resolution.to_string())),
    };
    match count.checked_mul(factor) {
        Some(0) | None => Err(SeriesError::InvalidResolution(resolution.to_string())),
        Some(minutes) => Ok(minutes),
    }
}

/// Bin `series` into `resolution_minutes` wide bins anchored at `origin` and
/// aggregate each non-empty bin. Bins are labelled by their left edge.
pub fn resample_from_origin(
    series: &Series,
    resolution_minutes: u32,
    origin: NaiveDateTime,
    aggregation: Aggregation,
) -> Series {
    let width = Duration::minutes(resolution_minutes as i64);
    let width_ms = width.num_milliseconds();
    let mut bins: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (timestamp, value) in series.iter() {
        let offset = (timestamp - origin).num_milliseconds();
        bins.entry(offset.div_euclid(width_ms)).or_default().push(value);
    }
    bins.into_iter()
        .map(|(bin, values)| {
            let label = origin + Duration::milliseconds(bin * width_ms);
            (label, aggregation.aggregate(&values))
        })
        .collect()
}

/// Resample `series` to a fixed resolution, with bins anchored at midnight of
/// the first day.
pub fn resample(series: &Series, resolution: &str, aggregation: Aggregation) -> Result<Series> {
    let minutes = parse_resolution(resolution)?;
    let origin = match series.first_timestamp() {
        Some(first) => first.date().and_time(NaiveTime::MIN),
        None => return Ok(Series::new()),
    };
    Ok(resample_from_origin(series, minutes, origin, aggregation))
}

/// Upsample onto the hourly base grid, holding values for step series and
/// interpolating otherwise.
pub fn to_hourly(series: &Series, is_step: bool) -> Series {
    let (first, last) = match (series.first_timestamp(), series.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Series::new(),
    };
    let grid = hourly_grid(first, last);
    if is_step {
        series.forward_fill_onto(grid)
    } else {
        series.interpolate_onto(grid)
    }
}

/// Bring `datapoints` onto the resolutions given by `schedule`.
///
/// Scalars and calls without an aggregation method pass through untouched.
/// An unknown method is logged and the input is returned unaggregated.
pub fn resample_and_aggregate(
    datapoints: Datapoints,
    method: Option<&str>,
    schedule: &ResolutionSchedule,
    is_step: bool,
) -> Result<Datapoints> {
    let series = match &datapoints {
        Datapoints::Scalar(_) => return Ok(datapoints),
        Datapoints::Series(series) => series,
    };
    let method = match method {
        Some(method) => method,
        None => return Ok(datapoints),
    };
    let data_start = match series.first_timestamp() {
        Some(start) => start,
        None => return Ok(datapoints),
    };
    let schedule_start = schedule.start().ok_or(SeriesError::EmptySchedule)?;
    if data_start < schedule_start {
        return Err(SeriesError::RangeViolation {
            data_start,
            schedule_start,
        });
    }
    let aggregation: Aggregation = match method.parse() {
        Ok(aggregation) => aggregation,
        Err(unknown) => {
            warn!(
                "Unsupported aggregation method '{}', returning series unaggregated",
                unknown
            );
            return Ok(datapoints);
        }
    };

    let hourly = to_hourly(series, is_step);
    let mut result = Series::new();
    for range in find_resolution_ranges(schedule) {
        let slice = hourly.slice(range.start, range.end);
        if slice.is_empty() {
            continue;
        }
        debug!(
            "Aggregating {} hourly points from {} with {} at {} minutes",
            slice.len(),
            range.start,
            aggregation,
            range.resolution_minutes
        );
        result.extend_from(resample_from_origin(
            &slice,
            range.resolution_minutes,
            range.start,
            aggregation,
        ));
    }
    Ok(Datapoints::Series(result))
}

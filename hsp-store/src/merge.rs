//! Range merging: raw store responses to hourly series.
//!
//! For each id the in-range datapoints are combined with the latest value at
//! or before the window start, so every series has a defined value from the
//! first hour on. Step series are then held onto an hourly grid, linear
//! series are interpolated at each grid point.

use crate::error::Result;
use crate::{Datapoint, TimeSeriesStore};
use chrono::{Duration, NaiveDateTime};
use hsp_series::time::{ceil_hour, floor_hour, from_millis, hourly_grid, to_millis};
use hsp_series::Series;
use log::{info, warn};
use std::collections::BTreeMap;

fn to_series(points: &[Datapoint]) -> Result<Series> {
    let mut series = Series::new();
    for point in points {
        series.insert(from_millis(point.timestamp)?, point.value);
    }
    Ok(series)
}

/// Step flag per id; ids without metadata are step series.
pub fn retrieve_step_flags<S>(store: &S, ids: &[String]) -> Result<BTreeMap<String, bool>>
where
    S: TimeSeriesStore + ?Sized,
{
    let metadata = store.retrieve_metadata(ids)?;
    Ok(ids
        .iter()
        .map(|id| {
            let is_step = metadata.get(id).map_or(true, |m| m.is_step);
            (id.clone(), is_step)
        })
        .collect())
}

/// Hourly series for each id over `[start, end)`.
///
/// Ids that yield no data are logged and left out of the result.
pub fn retrieve_range<S>(
    store: &S,
    ids: &[String],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<BTreeMap<String, Series>>
where
    S: TimeSeriesStore + ?Sized,
{
    if ids.is_empty() {
        return Ok(BTreeMap::new());
    }
    let step_flags = retrieve_step_flags(store, ids)?;
    retrieve_range_with_flags(store, ids, start, end, &step_flags)
}

/// [`retrieve_range`] with step flags the caller already holds (see
/// [`retrieve_step_flags`]). Ids missing from `step_flags` are step series.
pub fn retrieve_range_with_flags<S>(
    store: &S,
    ids: &[String],
    start: NaiveDateTime,
    end: NaiveDateTime,
    step_flags: &BTreeMap<String, bool>,
) -> Result<BTreeMap<String, Series>>
where
    S: TimeSeriesStore + ?Sized,
{
    let mut merged = BTreeMap::new();
    if ids.is_empty() {
        return Ok(merged);
    }
    let start_ms = to_millis(start);
    let ranges = store.retrieve_range(ids, start_ms, to_millis(end))?;
    let latest = store.retrieve_latest(ids, start_ms)?;

    // one lead and one lag point around the window
    let grid = hourly_grid(
        floor_hour(start) - Duration::hours(1),
        ceil_hour(end) + Duration::hours(1),
    );

    for id in ids {
        let mut combined = match ranges.get(id) {
            Some(points) => to_series(points)?,
            None => Series::new(),
        };
        if let Some(point) = latest.get(id) {
            if combined.is_empty() {
                combined.insert(start, point.value);
            } else {
                let timestamp = from_millis(point.timestamp)?;
                if combined.get(&timestamp).is_none() {
                    combined.insert(timestamp, point.value);
                }
            }
        }

        let is_step = step_flags.get(id).copied().unwrap_or(true);
        let gridded = if is_step {
            combined.forward_fill_onto(grid.iter().copied())
        } else {
            combined.interpolate_onto(grid.iter().copied())
        };
        let window = gridded.slice(start, Some(end));
        if window.is_empty() {
            warn!("No datapoints found for time series '{}'", id);
            continue;
        }
        merged.insert(id.clone(), window);
    }
    info!(
        "Retrieved {} of {} time series between {} and {}",
        merged.len(),
        ids.len(),
        start,
        end
    );
    Ok(merged)
}

/// Latest value at or before `at` for each id, as single-point series.
pub fn retrieve_latest_values<S>(
    store: &S,
    ids: &[String],
    at: NaiveDateTime,
) -> Result<BTreeMap<String, Series>>
where
    S: TimeSeriesStore + ?Sized,
{
    let mut result = BTreeMap::new();
    if ids.is_empty() {
        return Ok(result);
    }
    let latest = store.retrieve_latest(ids, to_millis(at))?;
    for id in ids {
        match latest.get(id) {
            Some(point) => {
                result.insert(id.clone(), Series::single(from_millis(point.timestamp)?, point.value));
            }
            None => warn!("No value at or before {} for time series '{}'", at, id),
        }
    }
    Ok(result)
}

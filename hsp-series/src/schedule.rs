//! Piecewise resolution schedules.
//!
//! The solver accepts a different time resolution for different parts of the
//! horizon (e.g. hourly for the first days, then 3-hourly). A
//! [`ResolutionSchedule`] lists the change points; [`find_resolution_ranges`]
//! turns it into contiguous constant-resolution ranges.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp -> resolution in minutes, sorted and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionSchedule(BTreeMap<NaiveDateTime, u32>);

impl ResolutionSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// A schedule with one resolution from `start` onward.
    pub fn constant(start: NaiveDateTime, resolution_minutes: u32) -> Self {
        let mut schedule = Self::new();
        schedule.insert(start, resolution_minutes);
        schedule
    }

    pub fn insert(&mut self, timestamp: NaiveDateTime, resolution_minutes: u32) {
        self.0.insert(timestamp, resolution_minutes);
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.0.keys().next().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, u32)> + '_ {
        self.0.iter().map(|(t, r)| (*t, *r))
    }
}

impl FromIterator<(NaiveDateTime, u32)> for ResolutionSchedule {
    fn from_iter<T: IntoIterator<Item = (NaiveDateTime, u32)>>(iter: T) -> Self {
        ResolutionSchedule(iter.into_iter().collect())
    }
}

/// A span of the horizon with a single resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolutionRange {
    pub resolution_minutes: u32,
    /// Inclusive.
    pub start: NaiveDateTime,
    /// Exclusive; `None` for the final, unbounded range.
    pub end: Option<NaiveDateTime>,
}

impl ResolutionRange {
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start && self.end.map_or(true, |end| timestamp < end)
    }
}

/// Collapse a schedule into contiguous constant-resolution ranges.
///
/// Consecutive entries with the same resolution are merged. Every range ends
/// where the next one starts, and the last range is unbounded.
pub fn find_resolution_ranges(schedule: &ResolutionSchedule) -> Vec<ResolutionRange> {
    let mut ranges: Vec<ResolutionRange> = Vec::new();
    for (timestamp, resolution) in schedule.iter() {
        match ranges.last_mut() {
            Some(current) if current.resolution_minutes == resolution => {}
            Some(current) => {
                current.end = Some(timestamp);
                ranges.push(ResolutionRange {
                    resolution_minutes: resolution,
                    start: timestamp,
                    end: None,
                });
            }
            None => ranges.push(ResolutionRange {
                resolution_minutes: resolution,
                start: timestamp,
                end: None,
            }),
        }
    }
    ranges
}

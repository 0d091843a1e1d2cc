//! An ordered, gap-aware time series.
//!
//! Missing values are represented by absence: a `Series` never stores NaN
//! placeholders, so reindexing operations simply leave out positions they
//! cannot fill.

use chrono::{Duration, NaiveDateTime};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Included, Unbounded};

/// Timestamp -> value map, sorted by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    points: BTreeMap<NaiveDateTime, f64>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// A series holding a single value.
    pub fn single(timestamp: NaiveDateTime, value: f64) -> Self {
        let mut series = Self::new();
        series.insert(timestamp, value);
        series
    }

    /// Insert or overwrite the value at `timestamp`.
    pub fn insert(&mut self, timestamp: NaiveDateTime, value: f64) {
        self.points.insert(timestamp, value);
    }

    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<f64> {
        self.points.get(timestamp).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.points.iter().map(|(t, v)| (*t, *v))
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.keys().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.values().copied()
    }

    pub fn first(&self) -> Option<(NaiveDateTime, f64)> {
        self.points.first_key_value().map(|(t, v)| (*t, *v))
    }

    pub fn last(&self) -> Option<(NaiveDateTime, f64)> {
        self.points.last_key_value().map(|(t, v)| (*t, *v))
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.first().map(|(t, _)| t)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.last().map(|(t, _)| t)
    }

    /// The most recent value observed at or before `timestamp`.
    pub fn value_at_or_before(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.points
            .range(..=timestamp)
            .next_back()
            .map(|(_, v)| *v)
    }

    /// Value at `timestamp` under time-weighted linear interpolation.
    ///
    /// Before the first point there is no value; after the last point the
    /// last value is held.
    pub fn interpolate_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        let (before_t, before_v) = self.points.range(..=timestamp).next_back()?;
        if *before_t == timestamp {
            return Some(*before_v);
        }
        match self.points.range((Excluded(timestamp), Unbounded)).next() {
            None => Some(*before_v),
            Some((after_t, after_v)) => {
                let span = (*after_t - *before_t).num_milliseconds() as f64;
                let elapsed = (timestamp - *before_t).num_milliseconds() as f64;
                Some(before_v + (after_v - before_v) * elapsed / span)
            }
        }
    }

    /// Reindex onto `index`, holding the last observed value.
    pub fn forward_fill_onto<I>(&self, index: I) -> Series
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        index
            .into_iter()
            .filter_map(|t| self.value_at_or_before(t).map(|v| (t, v)))
            .collect()
    }

    /// Reindex onto `index` with linear interpolation between observations.
    pub fn interpolate_onto<I>(&self, index: I) -> Series
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        index
            .into_iter()
            .filter_map(|t| self.interpolate_at(t).map(|v| (t, v)))
            .collect()
    }

    /// Apply `f` to every value.
    pub fn map_values<F>(&self, f: F) -> Series
    where
        F: Fn(f64) -> f64,
    {
        self.iter().map(|(t, v)| (t, f(v))).collect()
    }

    /// Points in `[start, end)`; `end = None` means unbounded.
    pub fn slice(&self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> Series {
        let upper = match end {
            Some(end) => Excluded(end),
            None => Unbounded,
        };
        Series {
            points: self
                .points
                .range((Included(start), upper))
                .map(|(t, v)| (*t, *v))
                .collect(),
        }
    }

    /// Move every timestamp forward by `minutes` (backward if negative).
    pub fn shift_minutes(&self, minutes: i64) -> Series {
        let delta = Duration::minutes(minutes);
        self.iter().map(|(t, v)| (t + delta, v)).collect()
    }

    /// Sorted, de-duplicated union of both indexes.
    pub fn union_index(&self, other: &Series) -> Vec<NaiveDateTime> {
        self.timestamps()
            .merge(other.timestamps())
            .dedup()
            .collect()
    }

    /// Combine with `other` over the union of both indexes.
    ///
    /// Both sides are forward filled onto the union. Positions where `other`
    /// has no value yet use `identity`; positions where `self` has no value
    /// yet are left out.
    pub fn combine_forward_filled<F>(&self, other: &Series, identity: f64, op: F) -> Series
    where
        F: Fn(f64, f64) -> f64,
    {
        self.union_index(other)
            .into_iter()
            .filter_map(|t| {
                let lhs = self.value_at_or_before(t)?;
                let rhs = other.value_at_or_before(t).unwrap_or(identity);
                Some((t, op(lhs, rhs)))
            })
            .collect()
    }

    /// Elementwise sum over the union of indexes, a missing side counting as `fill`.
    pub fn add_aligned(&self, other: &Series, fill: f64) -> Series {
        self.union_index(other)
            .into_iter()
            .map(|t| {
                let lhs = self.get(&t).unwrap_or(fill);
                let rhs = other.get(&t).unwrap_or(fill);
                (t, lhs + rhs)
            })
            .collect()
    }

    /// Smallest gap between consecutive timestamps.
    pub fn min_spacing(&self) -> Option<Duration> {
        self.timestamps()
            .tuple_windows()
            .map(|(a, b)| b - a)
            .min()
    }

    /// Append all points of `other`, overwriting on collisions.
    pub fn extend_from(&mut self, other: Series) {
        self.points.extend(other.points);
    }
}

impl FromIterator<(NaiveDateTime, f64)> for Series {
    fn from_iter<T: IntoIterator<Item = (NaiveDateTime, f64)>>(iter: T) -> Self {
        Series {
            points: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Series {
    type Item = (NaiveDateTime, f64);
    type IntoIter = btree_map::IntoIter<NaiveDateTime, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

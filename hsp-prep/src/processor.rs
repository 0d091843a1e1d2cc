//! Applies mappings to the model tree.
//!
//! All sources are fetched up front, one batch per retrieval mode. Mappings
//! are then applied one at a time in declared order: transformations, the
//! START/END collapse, resampling onto the resolution schedule and insertion
//! at the mapping's path.

use crate::error::Result;
use crate::mapping::Mapping;
use crate::transform::TransformContext;
use chrono::NaiveDateTime;
use hsp_model::{AttributePath, AttributeValue, ModelTree, RetrievalMode};
use hsp_series::{resample_and_aggregate, Datapoints, ResolutionSchedule, Series};
use hsp_store::{merge, TimeSeriesStore};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Why a mapping left the model untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source series had no data for the horizon.
    MissingData { time_series: String },
    /// The transformations produced nothing to write.
    EmptyAfterTransform,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingData { time_series } => write!(f, "no data for '{}'", time_series),
            SkipReason::EmptyAfterTransform => write!(f, "empty after transformations"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingOutcome {
    Applied,
    Skipped(SkipReason),
}

/// Per-mapping outcomes of one [`MappingProcessor::apply`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingReport {
    pub outcomes: Vec<(AttributePath, MappingOutcome)>,
}

impl MappingReport {
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == MappingOutcome::Applied)
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&AttributePath, &SkipReason)> {
        self.outcomes.iter().filter_map(|(path, outcome)| match outcome {
            MappingOutcome::Skipped(reason) => Some((path, reason)),
            MappingOutcome::Applied => None,
        })
    }
}

/// Sources fetched for one batch of mappings.
#[derive(Default)]
struct Fetched {
    range: BTreeMap<String, Series>,
    start: BTreeMap<String, Series>,
    end: BTreeMap<String, Series>,
    step_flags: BTreeMap<String, bool>,
}

impl Fetched {
    fn source(&self, mode: RetrievalMode, id: &str) -> Option<&Series> {
        match mode {
            RetrievalMode::Range => self.range.get(id),
            RetrievalMode::Start => self.start.get(id),
            RetrievalMode::End => self.end.get(id),
            RetrievalMode::None => None,
        }
    }
}

pub struct MappingProcessor<'a> {
    store: &'a dyn TimeSeriesStore,
    start: NaiveDateTime,
    end: NaiveDateTime,
    schedule: &'a ResolutionSchedule,
}

impl<'a> MappingProcessor<'a> {
    pub fn new(
        store: &'a dyn TimeSeriesStore,
        start: NaiveDateTime,
        end: NaiveDateTime,
        schedule: &'a ResolutionSchedule,
    ) -> Self {
        MappingProcessor {
            store,
            start,
            end,
            schedule,
        }
    }

    fn ids_for(mappings: &[Mapping], mode: RetrievalMode) -> Vec<String> {
        mappings
            .iter()
            .filter(|m| m.retrieve == mode)
            .filter_map(|m| m.source_id())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn fetch(&self, mappings: &[Mapping]) -> Result<Fetched> {
        let range_ids = Self::ids_for(mappings, RetrievalMode::Range);
        let start_ids = Self::ids_for(mappings, RetrievalMode::Start);
        let end_ids = Self::ids_for(mappings, RetrievalMode::End);

        let mut fetched = Fetched::default();
        if !range_ids.is_empty() {
            fetched.step_flags = merge::retrieve_step_flags(self.store, &range_ids)?;
            fetched.range = merge::retrieve_range_with_flags(
                self.store,
                &range_ids,
                self.start,
                self.end,
                &fetched.step_flags,
            )?;
        }
        fetched.start = merge::retrieve_latest_values(self.store, &start_ids, self.start)?;
        fetched.end = merge::retrieve_latest_values(self.store, &end_ids, self.end)?;
        info!(
            "Fetched {} range, {} start and {} end series for {} mappings",
            fetched.range.len(),
            fetched.start.len(),
            fetched.end.len(),
            mappings.len()
        );
        Ok(fetched)
    }

    /// Apply `mappings` to `model` in order.
    ///
    /// Missing data skips a mapping; any error aborts and leaves the writes
    /// made so far in place.
    pub fn apply(
        &self,
        model: &mut ModelTree,
        mappings: &[Mapping],
        shift_minutes: i64,
    ) -> Result<MappingReport> {
        let fetched = self.fetch(mappings)?;
        let mut report = MappingReport::default();
        for mapping in mappings {
            let outcome = self.apply_one(model, mapping, &fetched, shift_minutes)?;
            if let MappingOutcome::Skipped(reason) = &outcome {
                warn!("Skipping mapping for {}: {}", mapping.path, reason);
            }
            report.outcomes.push((mapping.path.clone(), outcome));
        }
        Ok(report)
    }

    fn apply_one(
        &self,
        model: &mut ModelTree,
        mapping: &Mapping,
        fetched: &Fetched,
        shift_minutes: i64,
    ) -> Result<MappingOutcome> {
        let source = match mapping.source_id() {
            None => Series::new(),
            Some(id) => match fetched.source(mapping.retrieve, id) {
                Some(series) => series.clone(),
                None => {
                    return Ok(MappingOutcome::Skipped(SkipReason::MissingData {
                        time_series: id.to_string(),
                    }))
                }
            },
        };

        let mut datapoints = Datapoints::Series(source);
        {
            let ctx = TransformContext {
                model,
                object_type: &mapping.path.object_type,
                instance: &mapping.path.instance,
                start: self.start,
                end: self.end,
                store: self.store,
                shift_minutes,
            };
            for transformation in &mapping.transformations {
                debug!("Applying {} to {}", transformation.name(), mapping.path);
                datapoints = transformation.apply(datapoints, &ctx)?;
            }
        }

        if matches!(mapping.retrieve, RetrievalMode::Start | RetrievalMode::End) {
            let first = datapoints.as_series().and_then(|series| series.first());
            if let Some((_, value)) = first {
                datapoints = Datapoints::Scalar(value);
            }
        }
        if datapoints.is_empty() {
            return Ok(MappingOutcome::Skipped(SkipReason::EmptyAfterTransform));
        }

        let is_step = mapping
            .source_id()
            .and_then(|id| fetched.step_flags.get(id).copied())
            .unwrap_or(true);
        let datapoints = resample_and_aggregate(
            datapoints,
            mapping.aggregation.as_deref(),
            self.schedule,
            is_step,
        )?;
        let value = match datapoints {
            Datapoints::Scalar(value) => AttributeValue::Scalar(value),
            Datapoints::Series(series) => AttributeValue::Series(series),
        };
        model.insert(&mapping.path, value);
        Ok(MappingOutcome::Applied)
    }
}

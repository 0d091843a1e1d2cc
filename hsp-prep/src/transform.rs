//! The transformation chain.
//!
//! Each [`Transformation`] is built once from its declaration (unknown names
//! and malformed parameters are rejected there) and may then be applied any
//! number of times. Application never mutates the transformation.

use crate::error::{PrepError, Result};
use crate::water_in_transit::add_water_in_transit;
use chrono::{Duration, NaiveDateTime};
use hsp_model::{CurveLookup, ModelTree, TransformationDeclaration};
use hsp_series::{Datapoints, Series};
use hsp_store::TimeSeriesStore;
use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Minutes relative to an anchor -> value.
pub type RelativeDatapoints = BTreeMap<i64, f64>;

/// Largest offset, delay or shift accepted, in either direction (100 years).
pub const MAX_OFFSET_MINUTES: i64 = 100 * 366 * 24 * 60;

/// `anchor` moved by `minutes`, or an error naming `transformation` if the
/// result is not a representable timestamp.
pub(crate) fn offset_by(anchor: NaiveDateTime, minutes: i64, transformation: &str) -> Result<NaiveDateTime> {
    Duration::try_minutes(minutes)
        .and_then(|delta| anchor.checked_add_signed(delta))
        .ok_or_else(|| PrepError::InvalidParameter {
            transformation: transformation.to_string(),
            parameter: minutes.to_string(),
            reason: format!("offset of {} minutes from {} is out of range", minutes, anchor),
        })
}

/// Everything a transformation may look at besides its input.
pub struct TransformContext<'a> {
    pub model: &'a ModelTree,
    pub object_type: &'a str,
    pub instance: &'a str,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub store: &'a dyn TimeSeriesStore,
    pub shift_minutes: i64,
}

/// Where upstream discharge for water-in-transit comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitSource {
    /// `gate` or `plant`
    pub object_type: String,
    pub object_name: String,
    /// Discharge series in the time-series store.
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    Add(f64),
    Multiply(f64),
    StaticValues(RelativeDatapoints),
    ToBool,
    ZeroIfNotOne,
    OneIfTwo,
    HeightToVolume,
    DoNothing,
    AddFromOffset(RelativeDatapoints),
    MultiplyFromOffset(RelativeDatapoints),
    AddWaterInTransit(TransitSource),
}

struct Parameters<'a> {
    transformation: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Parameters<'a> {
    fn invalid(&self, parameter: &str, reason: &str) -> PrepError {
        PrepError::InvalidParameter {
            transformation: self.transformation.to_string(),
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }

    fn number(&self, key: &str, value: &Value) -> Result<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| self.invalid(key, "expected a finite number"))
    }

    fn value(&self) -> Result<f64> {
        let value = self
            .map
            .get("value")
            .ok_or_else(|| self.invalid("value", "missing"))?;
        self.number("value", value)
    }

    fn text(&self, key: &str) -> Option<Result<String>> {
        self.map.get(key).map(|value| match value {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            _ => Err(self.invalid(key, "expected a non-empty string")),
        })
    }

    /// Every parameter is an offset in minutes mapped to a value.
    fn relative_datapoints(&self) -> Result<RelativeDatapoints> {
        self.map
            .iter()
            .map(|(key, value)| {
                let minutes = key
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| self.invalid(key, "expected an offset in minutes"))?;
                if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
                    return Err(self.invalid(key, "offset is out of range"));
                }
                Ok((minutes, self.number(key, value)?))
            })
            .collect()
    }

    fn transit_source(&self) -> Result<TransitSource> {
        let (object_type, object_name) = match (self.text("gate_name"), self.text("plant_name")) {
            (Some(gate), None) => ("gate", gate?),
            (None, Some(plant)) => ("plant", plant?),
            (Some(_), Some(_)) => {
                return Err(self.invalid("gate_name", "give either gate_name or plant_name, not both"))
            }
            (None, None) => return Err(self.invalid("gate_name", "gate_name or plant_name is required")),
        };
        let external_id = self
            .text("external_id")
            .ok_or_else(|| self.invalid("external_id", "missing"))??;
        Ok(TransitSource {
            object_type: object_type.to_string(),
            object_name,
            external_id,
        })
    }
}

impl Transformation {
    pub fn from_declaration(declaration: &TransformationDeclaration) -> Result<Self> {
        let name = declaration.name.trim().to_uppercase();
        let params = Parameters {
            transformation: &name,
            map: &declaration.parameters,
        };
        let transformation = match name.as_str() {
            "ADD" => Transformation::Add(params.value()?),
            "MULTIPLY" => Transformation::Multiply(params.value()?),
            "STATIC" => Transformation::StaticValues(params.relative_datapoints()?),
            "TO_BOOL" => Transformation::ToBool,
            "ZERO_IF_NOT_ONE" => Transformation::ZeroIfNotOne,
            "ONE_IF_TWO" => Transformation::OneIfTwo,
            "HEIGHT_TO_VOLUME" => Transformation::HeightToVolume,
            "DO_NOTHING" => Transformation::DoNothing,
            "ADD_FROM_OFFSET" => Transformation::AddFromOffset(params.relative_datapoints()?),
            "MULTIPLY_FROM_OFFSET" => {
                Transformation::MultiplyFromOffset(params.relative_datapoints()?)
            }
            "ADD_WATER_IN_TRANSIT" => Transformation::AddWaterInTransit(params.transit_source()?),
            _ => return Err(PrepError::UnknownTransformation(declaration.name.clone())),
        };
        Ok(transformation)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transformation::Add(_) => "ADD",
            Transformation::Multiply(_) => "MULTIPLY",
            Transformation::StaticValues(_) => "STATIC",
            Transformation::ToBool => "TO_BOOL",
            Transformation::ZeroIfNotOne => "ZERO_IF_NOT_ONE",
            Transformation::OneIfTwo => "ONE_IF_TWO",
            Transformation::HeightToVolume => "HEIGHT_TO_VOLUME",
            Transformation::DoNothing => "DO_NOTHING",
            Transformation::AddFromOffset(_) => "ADD_FROM_OFFSET",
            Transformation::MultiplyFromOffset(_) => "MULTIPLY_FROM_OFFSET",
            Transformation::AddWaterInTransit(_) => "ADD_WATER_IN_TRANSIT",
        }
    }

    pub fn apply(&self, datapoints: Datapoints, ctx: &TransformContext<'_>) -> Result<Datapoints> {
        match self {
            Transformation::Add(value) => Ok(datapoints.map_values(|v| v + value)),
            Transformation::Multiply(value) => Ok(datapoints.map_values(|v| v * value)),
            Transformation::StaticValues(relative) => {
                let anchor = offset_by(ctx.start, ctx.shift_minutes, self.name())?;
                Ok(Datapoints::Series(anchored(relative, anchor, self.name())?))
            }
            Transformation::ToBool => Ok(datapoints.map_values(|v| indicator(v > 0.0))),
            Transformation::ZeroIfNotOne => Ok(datapoints.map_values(|v| indicator(v == 1.0))),
            Transformation::OneIfTwo => Ok(datapoints.map_values(|v| indicator(v == 2.0))),
            Transformation::HeightToVolume => height_to_volume(datapoints, ctx),
            Transformation::DoNothing => Ok(datapoints),
            Transformation::AddFromOffset(relative) => combine_with_offset(
                datapoints,
                relative,
                ctx.shift_minutes,
                self.name(),
                0.0,
                |a, b| a + b,
            ),
            Transformation::MultiplyFromOffset(relative) => combine_with_offset(
                datapoints,
                relative,
                ctx.shift_minutes,
                self.name(),
                1.0,
                |a, b| a * b,
            ),
            Transformation::AddWaterInTransit(source) => add_water_in_transit(datapoints, source, ctx),
        }
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

fn anchored(relative: &RelativeDatapoints, anchor: NaiveDateTime, transformation: &str) -> Result<Series> {
    relative
        .iter()
        .map(|(minutes, value)| Ok((offset_by(anchor, *minutes, transformation)?, *value)))
        .collect()
}

/// Overlay `relative`, anchored at the first input timestamp plus `shift`,
/// onto the input over the union of both indexes.
fn combine_with_offset<F>(
    datapoints: Datapoints,
    relative: &RelativeDatapoints,
    shift_minutes: i64,
    transformation: &str,
    identity: f64,
    op: F,
) -> Result<Datapoints>
where
    F: Fn(f64, f64) -> f64,
{
    let earliest = match relative.values().next() {
        Some(value) => *value,
        None => return Ok(datapoints),
    };
    match datapoints {
        Datapoints::Scalar(value) => Ok(Datapoints::Scalar(op(value, earliest))),
        Datapoints::Series(series) => {
            let anchor = match series.first_timestamp() {
                Some(first) => offset_by(first, shift_minutes, transformation)?,
                None => return Ok(Datapoints::Series(series)),
            };
            let offset = anchored(relative, anchor, transformation)?;
            Ok(Datapoints::Series(series.combine_forward_filled(&offset, identity, op)))
        }
    }
}

fn height_to_volume(datapoints: Datapoints, ctx: &TransformContext<'_>) -> Result<Datapoints> {
    let curve = ctx
        .model
        .get(ctx.object_type, ctx.instance, "vol_head")
        .and_then(|value| value.as_curve())
        .ok_or_else(|| PrepError::MissingCurve {
            object_type: ctx.object_type.to_string(),
            instance: ctx.instance.to_string(),
            attribute: "vol_head".to_string(),
        })?;
    curve.validate()?;

    let mut clamped = 0usize;
    let mut lookup = |height: f64| match curve.interpolate(height) {
        CurveLookup::Interpolated(volume) => volume,
        CurveLookup::Clamped(volume) => {
            clamped += 1;
            volume
        }
    };
    let result = match datapoints {
        Datapoints::Scalar(height) => Datapoints::Scalar(lookup(height)),
        Datapoints::Series(series) => {
            Datapoints::Series(series.iter().map(|(t, height)| (t, lookup(height))).collect())
        }
    };
    if clamped > 0 {
        warn!(
            "{} height value(s) outside the vol_head curve of {} '{}' were clamped",
            clamped, ctx.object_type, ctx.instance
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hsp_model::{AttributePath, Curve};
    use hsp_store::SqliteStore;
    use serde_json::json;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    fn declaration(name: &str, parameters: Value) -> TransformationDeclaration {
        TransformationDeclaration {
            name: name.to_string(),
            parameters: parameters.as_object().cloned().unwrap_or_default(),
        }
    }

    fn series(values: &[f64]) -> Datapoints {
        Datapoints::Series(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (hour(i as i64), *v))
                .collect(),
        )
    }

    fn values(datapoints: &Datapoints) -> Vec<f64> {
        datapoints.as_series().unwrap().values().collect()
    }

    fn apply(transformation: &Transformation, model: &ModelTree, input: Datapoints) -> Result<Datapoints> {
        let store = SqliteStore::new().unwrap();
        let ctx = TransformContext {
            model,
            object_type: "reservoir",
            instance: "Res1",
            start: hour(0),
            end: hour(24),
            store: &store,
            shift_minutes: 0,
        };
        transformation.apply(input, &ctx)
    }

    #[test]
    fn test_from_declaration() {
        let add = Transformation::from_declaration(&declaration("ADD", json!({"value": 1.5}))).unwrap();
        assert_eq!(add, Transformation::Add(1.5));
        let multiply =
            Transformation::from_declaration(&declaration("multiply", json!({"value": "2"}))).unwrap();
        assert_eq!(multiply, Transformation::Multiply(2.0));
        let offset = Transformation::from_declaration(&declaration(
            "ADD_FROM_OFFSET",
            json!({"0": 10, "60": 20}),
        ))
        .unwrap();
        assert_eq!(
            offset,
            Transformation::AddFromOffset(vec![(0, 10.0), (60, 20.0)].into_iter().collect())
        );
        let transit = Transformation::from_declaration(&declaration(
            "ADD_WATER_IN_TRANSIT",
            json!({"gate_name": "Gate1", "external_id": "gate1_discharge"}),
        ))
        .unwrap();
        assert_eq!(transit.name(), "ADD_WATER_IN_TRANSIT");
    }

    #[test]
    fn test_unknown_name_is_a_configuration_error() {
        let err = Transformation::from_declaration(&declaration("SQUARE_ROOT", json!({}))).unwrap_err();
        assert!(matches!(err, PrepError::UnknownTransformation(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_bad_parameters_are_rejected() {
        assert!(Transformation::from_declaration(&declaration("ADD", json!({}))).is_err());
        assert!(Transformation::from_declaration(&declaration("ADD", json!({"value": "x"}))).is_err());
        assert!(Transformation::from_declaration(&declaration("STATIC", json!({"soon": 1}))).is_err());
        assert!(Transformation::from_declaration(&declaration("ADD", json!({"value": "NaN"}))).is_err());
        assert!(Transformation::from_declaration(&declaration("MULTIPLY", json!({"value": "inf"}))).is_err());
        assert!(Transformation::from_declaration(&declaration(
            "STATIC",
            json!({"10000000000000": 1})
        ))
        .is_err());
        assert!(Transformation::from_declaration(&declaration(
            "ADD_WATER_IN_TRANSIT",
            json!({"gate_name": "G", "plant_name": "P", "external_id": "x"})
        ))
        .is_err());
        assert!(Transformation::from_declaration(&declaration(
            "ADD_WATER_IN_TRANSIT",
            json!({"plant_name": "P"})
        ))
        .is_err());
    }

    #[test]
    fn test_arithmetic() {
        let model = ModelTree::new();
        let added = apply(&Transformation::Add(2.0), &model, series(&[1.0, 2.0])).unwrap();
        assert_eq!(values(&added), vec![3.0, 4.0]);
        let scaled = apply(&Transformation::Multiply(0.5), &model, Datapoints::Scalar(8.0)).unwrap();
        assert_eq!(scaled, Datapoints::Scalar(4.0));
        let same = apply(&Transformation::DoNothing, &model, series(&[7.0])).unwrap();
        assert_eq!(values(&same), vec![7.0]);
    }

    #[test]
    fn test_indicator_transformations() {
        let model = ModelTree::new();
        let input = series(&[-1.0, 0.0, 0.5, 1.0, 2.0]);
        let to_bool = apply(&Transformation::ToBool, &model, input.clone()).unwrap();
        assert_eq!(values(&to_bool), vec![0.0, 0.0, 1.0, 1.0, 1.0]);
        let zero_if_not_one = apply(&Transformation::ZeroIfNotOne, &model, input.clone()).unwrap();
        assert_eq!(values(&zero_if_not_one), vec![0.0, 0.0, 0.0, 1.0, 0.0]);
        let one_if_two = apply(&Transformation::OneIfTwo, &model, input).unwrap();
        assert_eq!(values(&one_if_two), vec![0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_static_values_ignore_input() {
        let model = ModelTree::new();
        let relative: RelativeDatapoints = vec![(0, 1.0), (120, 0.0)].into_iter().collect();
        let result = apply(
            &Transformation::StaticValues(relative),
            &model,
            series(&[5.0, 5.0, 5.0]),
        )
        .unwrap();
        assert_eq!(
            result.as_series().unwrap().iter().collect::<Vec<_>>(),
            vec![(hour(0), 1.0), (hour(2), 0.0)]
        );
    }

    #[test]
    fn test_add_from_offset_constant() {
        let model = ModelTree::new();
        let relative: RelativeDatapoints = vec![(0, 10.0)].into_iter().collect();
        let result = apply(
            &Transformation::AddFromOffset(relative),
            &model,
            series(&[3.0, 3.0, 3.0, 3.0]),
        )
        .unwrap();
        assert_eq!(values(&result), vec![13.0, 13.0, 13.0, 13.0]);
    }

    #[test]
    fn test_empty_offset_is_identity() {
        let model = ModelTree::new();
        let input = series(&[3.0, 4.0]);
        let result = apply(
            &Transformation::MultiplyFromOffset(RelativeDatapoints::new()),
            &model,
            input.clone(),
        )
        .unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_multiply_from_offset_introduces_timestamps() {
        let model = ModelTree::new();
        let relative: RelativeDatapoints = vec![(90, 2.0)].into_iter().collect();
        let result = apply(
            &Transformation::MultiplyFromOffset(relative),
            &model,
            series(&[1.0, 2.0, 3.0]),
        )
        .unwrap();
        let result = result.as_series().unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.get(&hour(0)), Some(1.0));
        assert_eq!(result.get(&hour(1)), Some(2.0));
        assert_eq!(result.get(&(hour(1) + Duration::minutes(30))), Some(4.0));
        assert_eq!(result.get(&hour(2)), Some(6.0));
    }

    #[test]
    fn test_height_to_volume() {
        let mut model = ModelTree::new();
        let path: AttributePath = "reservoir.Res1.vol_head".parse().unwrap();
        let curve = Curve::new(vec![2.0, 4.0, 6.0, 8.0, 10.0], vec![10.0, 20.0, 40.0, 80.0, 160.0])
            .unwrap();
        model.insert(&path, hsp_model::AttributeValue::Curve(curve));

        let result = apply(
            &Transformation::HeightToVolume,
            &model,
            series(&[1.0, 4.0, 6.0, 7.0, 11.0]),
        )
        .unwrap();
        assert_eq!(values(&result), vec![10.0, 20.0, 40.0, 60.0, 160.0]);
    }

    #[test]
    fn test_out_of_range_shift_is_an_error() {
        let store = SqliteStore::new().unwrap();
        let model = ModelTree::new();
        let ctx = TransformContext {
            model: &model,
            object_type: "reservoir",
            instance: "Res1",
            start: hour(0),
            end: hour(24),
            store: &store,
            shift_minutes: i64::MAX,
        };
        let relative: RelativeDatapoints = vec![(0, 1.0)].into_iter().collect();
        let err = Transformation::StaticValues(relative.clone())
            .apply(Datapoints::Scalar(0.0), &ctx)
            .unwrap_err();
        assert!(matches!(err, PrepError::InvalidParameter { .. }));
        let err = Transformation::AddFromOffset(relative)
            .apply(series(&[1.0]), &ctx)
            .unwrap_err();
        assert!(matches!(err, PrepError::InvalidParameter { .. }));
    }

    #[test]
    fn test_height_to_volume_without_curve() {
        let err = apply(&Transformation::HeightToVolume, &ModelTree::new(), series(&[1.0])).unwrap_err();
        assert!(matches!(err, PrepError::MissingCurve { .. }));
    }
}

//! The nested attribute tree handed to the solver.
//!
//! Layout is `object_type -> instance -> attribute -> value`. Values the
//! pipeline reads or writes are typed (scalars, curves, time series); any
//! other JSON a template carries is kept verbatim.

use crate::error::{ModelError, Result};
use crate::path::AttributePath;
use hsp_series::Series;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Attributes = BTreeMap<String, AttributeValue>;
pub type Instances = BTreeMap<String, Attributes>;

/// A piecewise-linear relation given by paired `x` / `y` axes.
///
/// Keys other than `x` and `y` (e.g. a curve's `ref`) are carried through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of looking a value up on a [`Curve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveLookup {
    Interpolated(f64),
    /// The input was outside the curve's domain and the nearest endpoint was used.
    Clamped(f64),
}

impl CurveLookup {
    pub fn value(&self) -> f64 {
        match self {
            CurveLookup::Interpolated(v) | CurveLookup::Clamped(v) => *v,
        }
    }
}

impl Curve {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let curve = Curve {
            x,
            y,
            extra: Map::new(),
        };
        curve.validate()?;
        Ok(curve)
    }

    /// Axes must be non-empty, of equal length and finite, with `x`
    /// non-decreasing.
    pub fn validate(&self) -> Result<()> {
        if self.x.is_empty() {
            return Err(ModelError::InvalidCurve("curve has no points".to_string()));
        }
        if self.x.len() != self.y.len() {
            return Err(ModelError::InvalidCurve(format!(
                "x has {} points, y has {}",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.iter().chain(&self.y).any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidCurve("axes contain non-finite values".to_string()));
        }
        if self.x.windows(2).any(|w| w[1] < w[0]) {
            return Err(ModelError::InvalidCurve("x is not sorted".to_string()));
        }
        Ok(())
    }

    /// `(x, y)` pairs in axis order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Linear interpolation of `y` at `x`, clamping to the end points outside
    /// the domain. The curve must be valid. NaN maps to NaN.
    pub fn interpolate(&self, x: f64) -> CurveLookup {
        if x.is_nan() {
            return CurveLookup::Interpolated(f64::NAN);
        }
        let last = self.x.len() - 1;
        if x < self.x[0] {
            return CurveLookup::Clamped(self.y[0]);
        }
        if x > self.x[last] {
            return CurveLookup::Clamped(self.y[last]);
        }
        let upper = self.x.partition_point(|xi| *xi < x);
        if self.x[upper] == x {
            return CurveLookup::Interpolated(self.y[upper]);
        }
        let (x0, x1) = (self.x[upper - 1], self.x[upper]);
        let (y0, y1) = (self.y[upper - 1], self.y[upper]);
        CurveLookup::Interpolated(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    }
}

/// Value of a single attribute.
///
/// Integers are kept apart from floats so a template's `3` is written back
/// as `3`, not `3.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Scalar(f64),
    Curve(Curve),
    Series(Series),
    Text(String),
    Other(serde_json::Value),
}

impl AttributeValue {
    /// Numeric value, integers included.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AttributeValue::Scalar(v) => Some(*v),
            AttributeValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_curve(&self) -> Option<&Curve> {
        match self {
            AttributeValue::Curve(curve) => Some(curve),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            AttributeValue::Series(series) => Some(series),
            _ => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Scalar(value)
    }
}

impl From<Series> for AttributeValue {
    fn from(series: Series) -> Self {
        AttributeValue::Series(series)
    }
}

/// `object_type -> instance -> attribute -> value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelTree(BTreeMap<String, Instances>);

impl ModelTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Attributes of one object instance.
    pub fn object(&self, object_type: &str, instance: &str) -> Option<&Attributes> {
        self.0.get(object_type)?.get(instance)
    }

    pub fn get(&self, object_type: &str, instance: &str, attribute: &str) -> Option<&AttributeValue> {
        self.object(object_type, instance)?.get(attribute)
    }

    pub fn get_path(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.get(&path.object_type, &path.instance, &path.attribute)
    }

    /// Set the value at `path`, creating the object type and instance levels
    /// when they do not exist yet. Returns the overwritten value, if any.
    pub fn insert(&mut self, path: &AttributePath, value: AttributeValue) -> Option<AttributeValue> {
        let previous = self
            .0
            .entry(path.object_type.clone())
            .or_default()
            .entry(path.instance.clone())
            .or_default()
            .insert(path.attribute.clone(), value);
        if previous.is_some() {
            debug!("Replaced existing value at {}", path);
        }
        previous
    }

    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn instances(&self, object_type: &str) -> impl Iterator<Item = &str> {
        self.0
            .get(object_type)
            .into_iter()
            .flat_map(|instances| instances.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

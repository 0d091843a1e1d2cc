//! Mapping declarations as they appear in configuration files.
//!
//! A declaration is untyped configuration; turning it into an executable
//! mapping (and rejecting unknown transformation names) happens in
//! `hsp-prep`.

use crate::error::Result;
use crate::path::AttributePath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the source series of a mapping is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetrievalMode {
    /// Nothing is fetched; the value is synthesized by the transformations.
    None,
    /// Latest value at or before the start of the horizon.
    Start,
    /// Latest value at or before the end of the horizon.
    End,
    /// All values within the horizon.
    #[default]
    Range,
}

/// A `{name, parameters}` pair naming one transformation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationDeclaration {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// One declared mapping from a source series to a model attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDeclaration {
    pub attribute: AttributePath,
    #[serde(default)]
    pub time_series: Option<String>,
    #[serde(default)]
    pub retrieve: RetrievalMode,
    #[serde(default)]
    pub aggregation: Option<String>,
    #[serde(default)]
    pub transformations: Vec<TransformationDeclaration>,
}

impl MappingDeclaration {
    /// Parse a JSON array of mapping declarations.
    pub fn parse_list(json: &str) -> Result<Vec<MappingDeclaration>> {
        Ok(serde_json::from_str(json)?)
    }
}

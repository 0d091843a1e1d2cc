use crate::error::Result;
use crate::transform::Transformation;
use hsp_model::{AttributePath, MappingDeclaration, RetrievalMode};

/// An executable mapping: where the value goes, where it comes from and
/// what happens to it on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub path: AttributePath,
    pub time_series: Option<String>,
    pub retrieve: RetrievalMode,
    pub transformations: Vec<Transformation>,
    pub aggregation: Option<String>,
}

impl Mapping {
    /// Parse and validate a JSON array of mapping declarations.
    pub fn parse_list(json: &str) -> Result<Vec<Mapping>> {
        MappingDeclaration::parse_list(json)?
            .into_iter()
            .map(Mapping::try_from)
            .collect()
    }

    /// Id to fetch, if this mapping fetches anything.
    pub fn source_id(&self) -> Option<&str> {
        match self.retrieve {
            RetrievalMode::None => None,
            _ => self.time_series.as_deref(),
        }
    }
}

impl TryFrom<MappingDeclaration> for Mapping {
    type Error = crate::error::PrepError;

    fn try_from(declaration: MappingDeclaration) -> Result<Self> {
        let transformations = declaration
            .transformations
            .iter()
            .map(Transformation::from_declaration)
            .collect::<Result<Vec<_>>>()?;
        Ok(Mapping {
            path: declaration.attribute,
            time_series: declaration.time_series,
            retrieve: declaration.retrieve,
            transformations,
            aggregation: declaration.aggregation,
        })
    }
}

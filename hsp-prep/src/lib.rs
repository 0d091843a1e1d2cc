//! Solver input preparation.
//!
//! Mappings bind a model attribute to a source time series and a recipe of
//! transformations and aggregation. The [`processor::MappingProcessor`]
//! fetches the sources, runs each mapping's recipe and writes the result
//! into the [`hsp_model::ModelTree`]; the [`writer::ModelWriter`] applies a
//! base mapping set followed by optional overrides and hands the finished
//! tree to [`solver_input::SolverInput`] for serialization.

pub mod case;
pub mod error;
pub mod mapping;
pub mod processor;
pub mod solver_input;
pub mod transform;
pub mod water_in_transit;
pub mod writer;

pub use case::CaseConfig;
pub use error::{PrepError, Result};
pub use mapping::Mapping;
pub use processor::{MappingOutcome, MappingProcessor, MappingReport, SkipReason};
pub use solver_input::SolverInput;
pub use transform::{TransformContext, Transformation};
pub use writer::ModelWriter;

/// Error types for solver input preparation
use hsp_model::ModelError;
use hsp_series::SeriesError;
use hsp_store::StoreError;
use thiserror::Error;

/// Fatal errors; any of these aborts the build in progress.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Transformation name not recognized
    #[error("Unknown transformation: {0}")]
    UnknownTransformation(String),

    /// Transformation parameter missing or malformed
    #[error("Invalid parameter '{parameter}' for {transformation}: {reason}")]
    InvalidParameter {
        transformation: String,
        parameter: String,
        reason: String,
    },

    /// No delay shape for water-in-transit
    #[error("No 'shape_discharge' or 'time_delay' on {object_type} '{object_name}'")]
    MissingShape {
        object_type: String,
        object_name: String,
    },

    /// Curve attribute required by a transformation is absent
    #[error("No '{attribute}' curve on {object_type} '{instance}'")]
    MissingCurve {
        object_type: String,
        instance: String,
        attribute: String,
    },

    /// Input finer than the hourly base resolution
    #[error("Unsupported resolution: {0}")]
    UnsupportedResolution(String),

    /// Input shape a transformation cannot handle
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    /// Case file or output document could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Case file parsed but is inconsistent
    #[error("Invalid case: {0}")]
    InvalidCase(String),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PrepError {
    /// True for errors caused by the mapping configuration or model template
    /// rather than by the data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            PrepError::UnknownTransformation(_)
                | PrepError::InvalidParameter { .. }
                | PrepError::MissingShape { .. }
                | PrepError::MissingCurve { .. }
                | PrepError::Json(_)
                | PrepError::InvalidCase(_)
                | PrepError::Model(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

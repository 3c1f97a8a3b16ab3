//! Error types for the concrete strength pipeline

use std::panic::Location;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("None of the models reached base accuracy {base_accuracy}")]
    NoAcceptableModel { base_accuracy: f64 },

    #[error("Worker error: {0}")]
    WorkerError(String),

    /// A stage failure, tagged with the stage name and the call site that propagated it
    #[error("[{location}] {stage} failed: {source}")]
    Stage {
        stage: &'static str,
        location: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Innermost error, skipping any stage wrappers
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::ShapeError {
            expected: "compatible shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::DownloadError(err.to_string())
    }
}

/// Attach stage name and source location to an error on its way up
pub trait StageContext<T> {
    fn stage(self, stage: &'static str) -> Result<T>;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<PipelineError>,
{
    #[track_caller]
    fn stage(self, stage: &'static str) -> Result<T> {
        let caller = Location::caller();
        self.map_err(|err| PipelineError::Stage {
            stage,
            location: format!("{}:{}", caller.file(), caller.line()),
            source: Box::new(err.into()),
        })
    }
}

//! Stage artifacts and experiment tracking records

mod artifact;
mod experiment;

pub use artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
};
pub use experiment::{Experiment, ExperimentLog};

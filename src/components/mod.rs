//! Pipeline stages
//!
//! Each stage is built from its config record plus the artifacts of the
//! stages before it, and produces one artifact via `initiate_*`.

pub mod data_ingestion;
pub mod data_transformation;
pub mod data_validation;
pub mod model_evaluation;
pub mod model_pusher;
pub mod model_trainer;

pub use data_ingestion::DataIngestion;
pub use data_transformation::DataTransformation;
pub use data_validation::DataValidation;
pub use model_evaluation::{EvaluationReport, ModelEvaluation, ModelRef};
pub use model_pusher::ModelPusher;
pub use model_trainer::ModelTrainer;

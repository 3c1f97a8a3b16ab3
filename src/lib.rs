//! Concrete strength - stage-based training pipeline
//!
//! This crate trains per-cluster regression models for concrete compressive
//! strength:
//! - Dataset ingestion (local file or http download) and schema validation
//! - Feature transformation: outlier masking, KNN imputation, log1p,
//!   standard scaling and elbow-selected KMeans clusters
//! - Per-cluster model selection by grid search and k-fold cross validation
//! - Champion / challenger evaluation with a persisted YAML history
//! - Export of accepted models and a CSV experiment log
//!
//! # Modules
//!
//! ## Core
//! - [`pipeline`] - Stage sequencing on a background worker
//! - [`components`] - The six pipeline stages
//! - [`entity`] - Stage artifacts and experiment records
//! - [`config`] - Pipeline, schema and model search configuration
//!
//! ## ML
//! - [`preprocessing`] - Feature pipeline and its transforms
//! - [`training`] - Regressors, grid search and the model factory
//!
//! ## Services
//! - [`cli`] - Command-line interface
//! - [`logging`] - Tracing subscriber setup

// Core error handling
pub mod error;

// Configuration and records
pub mod config;
pub mod entity;
pub mod utils;

// Core ML modules
pub mod preprocessing;
pub mod training;

// Pipeline
pub mod components;
pub mod pipeline;

// Services
pub mod cli;
pub mod logging;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PipelineError, Result, StageContext};

    // Configuration
    pub use crate::config::{Configuration, DatasetSchema, ModelConfig};

    // Records
    pub use crate::entity::{Experiment, ExperimentLog, ModelEvaluationArtifact, ModelTrainerArtifact};

    // Preprocessing
    pub use crate::preprocessing::{FeaturePipeline, FeatureTransform};

    // Training
    pub use crate::training::{ConcreteStrengthEstimator, GridSearchCV, ModelFactory, Regressor};

    // Pipeline
    pub use crate::pipeline::{Pipeline, PipelineOutcome};
}

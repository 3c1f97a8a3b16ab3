//! Records handed from one stage to the next

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub train_file_path: PathBuf,
    pub is_ingested: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub schema_file_path: PathBuf,
    pub is_validated: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub transformed_train_file_path: PathBuf,
    pub preprocessed_object_file_path: PathBuf,
    pub is_transformed: bool,
    pub message: String,
}

/// Training outcome, keyed by cluster id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub is_trained: bool,
    pub message: String,
    pub clusters: Vec<usize>,
    pub trained_model_paths: BTreeMap<usize, PathBuf>,
    pub train_rmse: BTreeMap<usize, f64>,
    pub train_accuracy: BTreeMap<usize, f64>,
    /// Cross-validated R² of the chosen model
    pub model_accuracy: BTreeMap<usize, f64>,
}

impl ModelTrainerArtifact {
    pub fn mean_model_accuracy(&self) -> Option<f64> {
        if self.model_accuracy.is_empty() {
            return None;
        }
        Some(self.model_accuracy.values().sum::<f64>() / self.model_accuracy.len() as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    pub clusters: Vec<usize>,
    pub is_models_accepted: BTreeMap<usize, bool>,
    pub evaluated_model_paths: BTreeMap<usize, PathBuf>,
}

impl ModelEvaluationArtifact {
    pub fn any_accepted(&self) -> bool {
        self.is_models_accepted.values().any(|&accepted| accepted)
    }

    pub fn accepted_clusters(&self) -> Vec<usize> {
        self.is_models_accepted
            .iter()
            .filter(|(_, &accepted)| accepted)
            .map(|(&cluster, _)| cluster)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    pub is_models_pushed: BTreeMap<usize, bool>,
    pub export_model_file_paths: BTreeMap<usize, Option<PathBuf>>,
}

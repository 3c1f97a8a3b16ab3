//! Pipeline configuration
//!
//! `config.yaml` is parsed once into [`PipelineConfigFile`]; [`Configuration`]
//! resolves it against a root directory and a run time stamp into the
//! immutable per-stage records consumed by the components.

mod model_config;
mod schema;

pub use model_config::{GridSearchSettings, ModelConfig, SuppliedModelConfig};
pub use schema::{DatasetSchema, SchemaDType};

use crate::error::{PipelineError, Result};
use crate::utils::read_yaml_file;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DATA_INGESTION_ARTIFACT_DIR: &str = "data_ingestion";
pub const DATA_TRANSFORMATION_ARTIFACT_DIR: &str = "data_transformation";
pub const MODEL_TRAINER_ARTIFACT_DIR: &str = "model_trainer";
pub const MODEL_EVALUATION_DIR: &str = "model_evaluation";
pub const EXPERIMENT_DIR_NAME: &str = "experiment";
pub const EXPERIMENT_FILE_NAME: &str = "experiment.csv";

/// Column holding the cluster label in the transformed training data
pub const CLUSTER_COLUMN_NAME: &str = "cluster";

/// Time stamp format used for run directories and history keys
pub const TIME_STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub fn current_time_stamp() -> String {
    chrono::Utc::now().format(TIME_STAMP_FORMAT).to_string()
}

// ─── Raw file layout ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPipelineSection {
    pub pipeline_name: String,
    pub artifact_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIngestionSection {
    pub dataset_name: String,
    /// Local path (relative to the root) or http(s) URL
    pub dataset_source: String,
    pub dataset_file_name: String,
    pub raw_data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataValidationSection {
    pub schema_dir: String,
    pub schema_file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTransformationSection {
    pub transformed_dir: String,
    pub transformed_train_dir: String,
    pub preprocessing_dir: String,
    pub preprocessed_object_file_name: String,
    #[serde(default = "default_iqr_factor")]
    pub outlier_iqr_factor: f64,
    #[serde(default = "default_knn_neighbors")]
    pub knn_neighbors: usize,
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelTrainerSection {
    pub trained_model_dir: String,
    #[serde(default = "default_model_file_prefix")]
    pub model_file_prefix: String,
    pub base_accuracy: f64,
    pub model_config_dir: String,
    pub model_config_file_name: String,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluationSection {
    pub model_evaluation_file_prefix: String,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPusherSection {
    pub model_export_dir: String,
}

fn default_iqr_factor() -> f64 {
    1.5
}

fn default_knn_neighbors() -> usize {
    3
}

fn default_max_clusters() -> usize {
    10
}

fn default_random_state() -> u64 {
    42
}

fn default_model_file_prefix() -> String {
    "model_cluster".to_string()
}

fn default_cv_folds() -> usize {
    3
}

/// Parsed `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfigFile {
    pub training_pipeline_config: TrainingPipelineSection,
    pub data_ingestion_config: DataIngestionSection,
    pub data_validation_config: DataValidationSection,
    pub data_transformation_config: DataTransformationSection,
    pub model_trainer_config: ModelTrainerSection,
    pub model_evaluation_config: ModelEvaluationSection,
    pub model_pusher_config: ModelPusherSection,
}

impl PipelineConfigFile {
    fn check(&self) -> Result<()> {
        let t = &self.data_transformation_config;
        if t.outlier_iqr_factor <= 0.0 {
            return Err(PipelineError::ConfigError(
                "outlier_iqr_factor must be positive".to_string(),
            ));
        }
        if t.knn_neighbors == 0 || t.max_clusters == 0 {
            return Err(PipelineError::ConfigError(
                "knn_neighbors and max_clusters must be at least 1".to_string(),
            ));
        }
        if self.model_trainer_config.cv_folds < 2 || self.model_evaluation_config.cv_folds < 2 {
            return Err(PipelineError::ConfigError("cv_folds must be at least 2".to_string()));
        }
        Ok(())
    }
}

// ─── Stage records ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPipelineConfig {
    pub artifact_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionConfig {
    pub dataset_name: String,
    pub dataset_source: String,
    pub dataset_file_name: String,
    pub raw_data_dir: PathBuf,
    /// Root used to resolve a relative local source
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationConfig {
    pub schema_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    pub transformed_train_dir: PathBuf,
    pub preprocessed_object_file_path: PathBuf,
    pub outlier_iqr_factor: f64,
    pub knn_neighbors: usize,
    pub max_clusters: usize,
    pub random_state: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerConfig {
    pub trained_models_dir: PathBuf,
    pub model_file_prefix: String,
    pub base_accuracy: f64,
    pub model_config_file_path: PathBuf,
    pub cv_folds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationConfig {
    pub evaluation_dir: PathBuf,
    pub file_prefix: String,
    pub time_stamp: String,
    pub cv_folds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPusherConfig {
    pub export_dir: PathBuf,
}

// ─── Resolver ─────────────────────────────────────────────────────────────────

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct Configuration {
    info: PipelineConfigFile,
    root_dir: PathBuf,
    time_stamp: String,
}

impl Configuration {
    /// Read `config_path` and stamp the run with the current time
    pub fn new(config_path: &Path, root_dir: &Path) -> Result<Self> {
        Self::with_time_stamp(config_path, root_dir, current_time_stamp())
    }

    pub fn with_time_stamp(config_path: &Path, root_dir: &Path, time_stamp: String) -> Result<Self> {
        let info: PipelineConfigFile = read_yaml_file(config_path)?;
        info.check()?;
        info!(path = %config_path.display(), time_stamp = %time_stamp, "Read configuration file");
        Ok(Self {
            info,
            root_dir: root_dir.to_path_buf(),
            time_stamp,
        })
    }

    pub fn from_parts(info: PipelineConfigFile, root_dir: &Path, time_stamp: String) -> Result<Self> {
        info.check()?;
        Ok(Self {
            info,
            root_dir: root_dir.to_path_buf(),
            time_stamp,
        })
    }

    /// Same settings, new run time stamp that no earlier run has used
    pub fn refreshed(&self) -> Self {
        Self {
            info: self.info.clone(),
            root_dir: self.root_dir.clone(),
            time_stamp: self.unused_time_stamp(&current_time_stamp()),
        }
    }

    /// Same settings; the time stamp gets a suffix if a run already used it
    pub fn unused(&self) -> Self {
        Self {
            info: self.info.clone(),
            root_dir: self.root_dir.clone(),
            time_stamp: self.unused_time_stamp(&self.time_stamp),
        }
    }

    /// `base`, or `base-N` with the smallest N such that no stage has a run
    /// directory under that stamp yet
    fn unused_time_stamp(&self, base: &str) -> String {
        let artifact_dir = self.training_pipeline_config().artifact_dir;
        let taken = |stamp: &str| {
            [DATA_INGESTION_ARTIFACT_DIR, DATA_TRANSFORMATION_ARTIFACT_DIR, MODEL_TRAINER_ARTIFACT_DIR]
                .iter()
                .any(|stage| artifact_dir.join(stage).join(stamp).exists())
        };

        let mut stamp = base.to_string();
        let mut n = 0;
        while taken(&stamp) {
            n += 1;
            stamp = format!("{}-{}", base, n);
        }
        if n > 0 {
            debug!(base, time_stamp = %stamp, "Time stamp already used, suffixed");
        }
        stamp
    }

    pub fn time_stamp(&self) -> &str {
        &self.time_stamp
    }

    pub fn training_pipeline_config(&self) -> TrainingPipelineConfig {
        let section = &self.info.training_pipeline_config;
        TrainingPipelineConfig {
            artifact_dir: self
                .root_dir
                .join(&section.pipeline_name)
                .join(&section.artifact_dir),
        }
    }

    fn run_dir(&self, stage_dir: &str) -> PathBuf {
        self.training_pipeline_config()
            .artifact_dir
            .join(stage_dir)
            .join(&self.time_stamp)
    }

    pub fn data_ingestion_config(&self) -> DataIngestionConfig {
        let section = &self.info.data_ingestion_config;
        DataIngestionConfig {
            dataset_name: section.dataset_name.clone(),
            dataset_source: section.dataset_source.clone(),
            dataset_file_name: section.dataset_file_name.clone(),
            raw_data_dir: self.run_dir(DATA_INGESTION_ARTIFACT_DIR).join(&section.raw_data_dir),
            root_dir: self.root_dir.clone(),
        }
    }

    pub fn data_validation_config(&self) -> DataValidationConfig {
        let section = &self.info.data_validation_config;
        DataValidationConfig {
            schema_file_path: self
                .root_dir
                .join(&section.schema_dir)
                .join(&section.schema_file_name),
        }
    }

    pub fn data_transformation_config(&self) -> DataTransformationConfig {
        let section = &self.info.data_transformation_config;
        let run_dir = self.run_dir(DATA_TRANSFORMATION_ARTIFACT_DIR);
        DataTransformationConfig {
            transformed_train_dir: run_dir
                .join(&section.transformed_dir)
                .join(&section.transformed_train_dir),
            preprocessed_object_file_path: run_dir
                .join(&section.preprocessing_dir)
                .join(&section.preprocessed_object_file_name),
            outlier_iqr_factor: section.outlier_iqr_factor,
            knn_neighbors: section.knn_neighbors,
            max_clusters: section.max_clusters,
            random_state: section.random_state,
        }
    }

    pub fn model_trainer_config(&self) -> ModelTrainerConfig {
        let section = &self.info.model_trainer_config;
        ModelTrainerConfig {
            trained_models_dir: self
                .run_dir(MODEL_TRAINER_ARTIFACT_DIR)
                .join(&section.trained_model_dir),
            model_file_prefix: section.model_file_prefix.clone(),
            base_accuracy: section.base_accuracy,
            model_config_file_path: self
                .root_dir
                .join(&section.model_config_dir)
                .join(&section.model_config_file_name),
            cv_folds: section.cv_folds,
        }
    }

    pub fn model_evaluation_config(&self) -> ModelEvaluationConfig {
        let section = &self.info.model_evaluation_config;
        ModelEvaluationConfig {
            evaluation_dir: self.training_pipeline_config().artifact_dir.join(MODEL_EVALUATION_DIR),
            file_prefix: section.model_evaluation_file_prefix.clone(),
            time_stamp: self.time_stamp.clone(),
            cv_folds: section.cv_folds,
        }
    }

    pub fn model_pusher_config(&self) -> ModelPusherConfig {
        ModelPusherConfig {
            export_dir: self.root_dir.join(&self.info.model_pusher_config.model_export_dir),
        }
    }

    pub fn experiment_file_path(&self) -> PathBuf {
        self.training_pipeline_config()
            .artifact_dir
            .join(EXPERIMENT_DIR_NAME)
            .join(EXPERIMENT_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
training_pipeline_config:
  pipeline_name: concrete
  artifact_dir: artifact
data_ingestion_config:
  dataset_name: concrete-compressive-strength
  dataset_source: data/concrete.csv
  dataset_file_name: concrete.csv
  raw_data_dir: raw_data
data_validation_config:
  schema_dir: config
  schema_file_name: schema.yaml
data_transformation_config:
  transformed_dir: transformed_data
  transformed_train_dir: train
  preprocessing_dir: preprocessed
  preprocessed_object_file_name: preprocessed.json
model_trainer_config:
  trained_model_dir: trained_model
  base_accuracy: 0.6
  model_config_dir: config
  model_config_file_name: model.yaml
model_evaluation_config:
  model_evaluation_file_prefix: model_evaluation_cluster
model_pusher_config:
  model_export_dir: saved_models
"#;

    fn configuration(dir: &TempDir) -> Configuration {
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, CONFIG).unwrap();
        Configuration::with_time_stamp(&path, dir.path(), "2026-10-18-10-00-00".to_string()).unwrap()
    }

    #[test]
    fn test_stage_paths_are_time_stamped() {
        let dir = TempDir::new().unwrap();
        let config = configuration(&dir);
        let artifact = dir.path().join("concrete").join("artifact");

        assert_eq!(config.training_pipeline_config().artifact_dir, artifact);
        assert_eq!(
            config.data_ingestion_config().raw_data_dir,
            artifact.join("data_ingestion").join("2026-10-18-10-00-00").join("raw_data")
        );
        assert_eq!(
            config.model_trainer_config().trained_models_dir,
            artifact.join("model_trainer").join("2026-10-18-10-00-00").join("trained_model")
        );
        assert_eq!(config.model_evaluation_config().evaluation_dir, artifact.join("model_evaluation"));
        assert_eq!(config.model_pusher_config().export_dir, dir.path().join("saved_models"));
    }

    #[test]
    fn test_used_time_stamp_is_suffixed() {
        let dir = TempDir::new().unwrap();
        let config = configuration(&dir);
        let artifact = dir.path().join("concrete").join("artifact");

        assert_eq!(config.unused_time_stamp("2026-10-18-10-00-00"), "2026-10-18-10-00-00");

        std::fs::create_dir_all(artifact.join("data_ingestion").join("2026-10-18-10-00-00")).unwrap();
        assert_eq!(config.unused_time_stamp("2026-10-18-10-00-00"), "2026-10-18-10-00-00-1");

        std::fs::create_dir_all(artifact.join("model_trainer").join("2026-10-18-10-00-00-1")).unwrap();
        assert_eq!(config.unused_time_stamp("2026-10-18-10-00-00"), "2026-10-18-10-00-00-2");
    }

    #[test]
    fn test_defaults_applied() {
        let dir = TempDir::new().unwrap();
        let config = configuration(&dir);
        let t = config.data_transformation_config();
        assert_eq!(t.knn_neighbors, 3);
        assert_eq!(t.max_clusters, 10);
        assert!((t.outlier_iqr_factor - 1.5).abs() < 1e-12);
        assert_eq!(config.model_trainer_config().model_file_prefix, "model_cluster");
        assert_eq!(config.model_evaluation_config().cv_folds, 3);
    }

    #[test]
    fn test_missing_section_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "training_pipeline_config:\n  pipeline_name: x\n  artifact_dir: y\n").unwrap();
        assert!(Configuration::new(&path, dir.path()).is_err());
    }
}

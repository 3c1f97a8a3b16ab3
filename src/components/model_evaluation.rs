//! Model evaluation: champion / challenger comparison per cluster.
//!
//! Each cluster keeps a YAML report naming its current best model and the
//! models it replaced:
//!
//! ```yaml
//! best_model:
//!   model_path: /runs/model_trainer/2026-10-18-11-00-00/trained_model/model_cluster0.json
//! history:
//!   2026-10-18-11-00-00:
//!     model_path: /runs/model_trainer/2026-10-18-10-00-00/trained_model/model_cluster0.json
//! ```
//!
//! A cluster without a best model accepts the new one outright. Otherwise
//! both are cross-validated on the freshly ingested data and the new model
//! must score strictly higher.

use crate::config::ModelEvaluationConfig;
use crate::entity::{DataIngestionArtifact, DataValidationArtifact, ModelEvaluationArtifact, ModelTrainerArtifact};
use crate::error::{PipelineError, Result};
use crate::training::ConcreteStrengthEstimator;
use crate::utils::{get_cluster, load_data, read_yaml_file, write_yaml_file};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub model_path: PathBuf,
}

/// Contents of one cluster's evaluation file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_model: Option<ModelRef>,
    /// Superseded best models keyed by the time stamp of the run that replaced them
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub history: BTreeMap<String, ModelRef>,
}

impl EvaluationReport {
    /// Read a report; an empty file is an empty report
    pub fn load(path: &Path) -> Result<Self> {
        let content: Option<Self> = read_yaml_file(path)?;
        Ok(content.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_yaml_file(path, self)
    }

    /// Make `model_path` the best model, moving the previous one into history
    pub fn promote(&mut self, model_path: &Path, time_stamp: &str) {
        if let Some(previous) = self.best_model.take() {
            self.history.insert(time_stamp.to_string(), previous);
        }
        self.best_model = Some(ModelRef {
            model_path: model_path.to_path_buf(),
        });
    }
}

pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
    data_ingestion_artifact: DataIngestionArtifact,
    data_validation_artifact: DataValidationArtifact,
    model_trainer_artifact: ModelTrainerArtifact,
}

impl ModelEvaluation {
    pub fn new(
        config: ModelEvaluationConfig,
        data_ingestion_artifact: DataIngestionArtifact,
        data_validation_artifact: DataValidationArtifact,
        model_trainer_artifact: ModelTrainerArtifact,
    ) -> Self {
        info!("Model evaluation started");
        Self {
            config,
            data_ingestion_artifact,
            data_validation_artifact,
            model_trainer_artifact,
        }
    }

    pub fn evaluation_file_path(&self, cluster: usize) -> PathBuf {
        self.config
            .evaluation_dir
            .join(format!("{}{}.yaml", self.config.file_prefix, cluster))
    }

    /// Current best model of every trained cluster, `None` where there is none.
    /// Missing report files are created empty.
    pub fn get_previous_best_models(&self) -> Result<BTreeMap<usize, Option<ConcreteStrengthEstimator>>> {
        info!("Get previous best models");
        let mut previous = BTreeMap::new();

        for &cluster in &self.model_trainer_artifact.clusters {
            let path = self.evaluation_file_path(cluster);
            debug!(cluster, path = %path.display(), "Reading evaluation report");

            if !path.exists() {
                EvaluationReport::default().save(&path)?;
                info!(cluster, "No previous model found");
                previous.insert(cluster, None);
                continue;
            }

            match EvaluationReport::load(&path)?.best_model {
                Some(best) => {
                    let model = ConcreteStrengthEstimator::load(&best.model_path)?;
                    info!(cluster, model = %model, path = %best.model_path.display(), "Previous best model");
                    previous.insert(cluster, Some(model));
                }
                None => {
                    info!(cluster, "No previous model found");
                    previous.insert(cluster, None);
                }
            }
        }
        Ok(previous)
    }

    pub fn update_evaluation_report(&self, cluster: usize, evaluated_model_path: &Path) -> Result<()> {
        let path = self.evaluation_file_path(cluster);
        let mut report = if path.exists() {
            EvaluationReport::load(&path)?
        } else {
            EvaluationReport::default()
        };
        debug!(cluster, ?report, "Previous evaluation report");

        report.promote(evaluated_model_path, &self.config.time_stamp);
        report.save(&path)?;
        info!(cluster, best_model = %evaluated_model_path.display(), "Updated evaluation report");
        Ok(())
    }

    /// Load the models trained in this run, keyed by the cluster in their file name
    fn trained_models(&self) -> Result<BTreeMap<usize, (PathBuf, ConcreteStrengthEstimator)>> {
        let mut models = BTreeMap::new();
        for path in self.model_trainer_artifact.trained_model_paths.values() {
            let cluster = get_cluster(path)?;
            let model = ConcreteStrengthEstimator::load(path)?;
            info!(cluster, model = %model, "Currently trained model");
            models.insert(cluster, (path.clone(), model));
        }
        Ok(models)
    }

    pub fn initiate_model_evaluation(&self) -> Result<ModelEvaluationArtifact> {
        let trained = self.trained_models()?;
        let previous = self.get_previous_best_models()?;

        let train_df = load_data(
            &self.data_ingestion_artifact.train_file_path,
            &self.data_validation_artifact.schema_file_path,
        )?;

        let mut is_models_accepted = BTreeMap::new();
        let mut evaluated_model_paths = BTreeMap::new();

        for &cluster in &self.model_trainer_artifact.clusters {
            info!(cluster, "Model evaluation");
            let (trained_path, trained_model) = trained.get(&cluster).ok_or_else(|| {
                PipelineError::DataError(format!("No trained model for cluster {}", cluster))
            })?;
            evaluated_model_paths.insert(cluster, trained_path.clone());

            let champion = match previous.get(&cluster) {
                Some(Some(model)) => model,
                _ => {
                    self.update_evaluation_report(cluster, trained_path)?;
                    is_models_accepted.insert(cluster, true);
                    info!(cluster, path = %trained_path.display(), "No existing model, currently trained model accepted");
                    continue;
                }
            };

            info!(cluster, previous = %champion, current = %trained_model, "Comparing previous and current model");
            // Both models are scored on the rows the current run assigns to this cluster
            let rows = trained_model.cluster_row_indices(&train_df)?;
            let folds = self.config.cv_folds;
            let challenger_score = trained_model.cross_validated_r2(&train_df, &rows, folds)?;
            let champion_score = champion.cross_validated_r2(&train_df, &rows, folds)?;
            info!(cluster, rows = rows.len(), champion_score, challenger_score, "Cross-validated R2");

            let accepted = challenger_score > champion_score;
            if accepted {
                self.update_evaluation_report(cluster, trained_path)?;
                info!(cluster, path = %trained_path.display(), "Current model accepted");
            } else {
                info!(cluster, "Trained model is no better than existing model, not accepting it");
            }
            is_models_accepted.insert(cluster, accepted);
        }

        let artifact = ModelEvaluationArtifact {
            clusters: self.model_trainer_artifact.clusters.clone(),
            is_models_accepted,
            evaluated_model_paths,
        };
        info!(accepted = ?artifact.accepted_clusters(), "Model evaluation completed");
        Ok(artifact)
    }
}

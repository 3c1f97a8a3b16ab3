//! Model trainer: pick and fit one model per cluster

use crate::config::{ModelTrainerConfig, CLUSTER_COLUMN_NAME};
use crate::entity::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::error::{PipelineError, Result};
use crate::preprocessing::FeaturePipeline;
use crate::training::{evaluate_regression_model, ConcreteStrengthEstimator, ModelFactory, Regressor};
use crate::utils::{column_to_array1, columns_to_array2, read_csv};
use ndarray::{Array1, Array2, Axis};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::info;

pub struct ModelTrainer {
    config: ModelTrainerConfig,
    data_transformation_artifact: DataTransformationArtifact,
}

/// Transformed training data split into matrix form
struct TrainingData {
    x: Array2<f64>,
    y: Array1<f64>,
    clusters: Vec<usize>,
    target_column: String,
}

impl TrainingData {
    fn cluster_rows(&self, cluster: usize) -> (Array2<f64>, Array1<f64>) {
        let rows: Vec<usize> = self
            .clusters
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect();
        (self.x.select(Axis(0), &rows), self.y.select(Axis(0), &rows))
    }

    fn unique_clusters(&self) -> Vec<usize> {
        self.clusters.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
    }
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig, data_transformation_artifact: DataTransformationArtifact) -> Self {
        info!("Model trainer started");
        Self {
            config,
            data_transformation_artifact,
        }
    }

    /// Features are every column except the cluster label and the target,
    /// which is the last column
    fn load_training_data(&self) -> Result<TrainingData> {
        let path = &self.data_transformation_artifact.transformed_train_file_path;
        info!(path = %path.display(), "Loading transformed training data");
        let df = read_csv(path)?;

        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        let target_column = names
            .last()
            .cloned()
            .ok_or_else(|| PipelineError::DataError(format!("{} has no columns", path.display())))?;
        let feature_columns: Vec<String> = names
            .iter()
            .filter(|name| **name != CLUSTER_COLUMN_NAME && **name != target_column)
            .cloned()
            .collect();

        let clusters = column_to_array1(&df, CLUSTER_COLUMN_NAME)?
            .iter()
            .map(|&c| {
                if c.is_finite() && c >= 0.0 && c.fract() == 0.0 {
                    Ok(c as usize)
                } else {
                    Err(PipelineError::DataError(format!("Invalid cluster label {}", c)))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TrainingData {
            x: columns_to_array2(&df, &feature_columns)?,
            y: column_to_array1(&df, &target_column)?,
            clusters,
            target_column,
        })
    }

    fn model_file_path(&self, cluster: usize) -> PathBuf {
        self.config
            .trained_models_dir
            .join(format!("{}{}.json", self.config.model_file_prefix, cluster))
    }

    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        let data = self.load_training_data()?;
        let clusters = data.unique_clusters();
        info!(?clusters, "Clusters in training data");

        // Model files of earlier runs are never overwritten
        for &cluster in &clusters {
            let path = self.model_file_path(cluster);
            if path.exists() {
                return Err(PipelineError::TrainingError(format!(
                    "Trained model {} already exists",
                    path.display()
                )));
            }
        }

        let preprocessor = FeaturePipeline::load(&self.data_transformation_artifact.preprocessed_object_file_path)?;
        let base_accuracy = self.config.base_accuracy;

        let mut artifact = ModelTrainerArtifact {
            is_trained: false,
            message: String::new(),
            clusters: clusters.clone(),
            trained_model_paths: BTreeMap::new(),
            train_rmse: BTreeMap::new(),
            train_accuracy: BTreeMap::new(),
            model_accuracy: BTreeMap::new(),
        };

        for &cluster in &clusters {
            let (x, y) = data.cluster_rows(cluster);
            info!(cluster, rows = x.nrows(), "Training cluster");

            let mut factory = ModelFactory::from_file(&self.config.model_config_file_path)?;
            let details = factory.get_best_model(&x, &y, base_accuracy)?;
            info!(cluster, model = %details.best_model.model_name, score = details.best_model.best_score, "Best model found on training data");

            let models: Vec<Regressor> = details
                .grid_searched_best_model_list
                .iter()
                .map(|m| m.best_model.clone())
                .collect();
            let metric_info = evaluate_regression_model(&models, &x, &y, base_accuracy, self.config.cv_folds)?
                .ok_or(PipelineError::NoAcceptableModel { base_accuracy })?;
            info!(
                cluster,
                model = %metric_info.model_name,
                model_accuracy = metric_info.model_accuracy,
                "Best model after cross validation"
            );

            let estimator = ConcreteStrengthEstimator::new(
                cluster,
                data.target_column.clone(),
                preprocessor.clone(),
                metric_info.model,
            );
            let path = self.model_file_path(cluster);
            estimator.save(&path)?;
            info!(cluster, path = %path.display(), "Saved trained model");

            artifact.trained_model_paths.insert(cluster, path);
            artifact.train_rmse.insert(cluster, metric_info.train_rmse);
            artifact.train_accuracy.insert(cluster, metric_info.train_accuracy);
            artifact.model_accuracy.insert(cluster, metric_info.model_accuracy);
        }

        artifact.is_trained = true;
        artifact.message = "Model Trained successfully".to_string();
        info!(clusters = artifact.clusters.len(), "Model trainer completed");
        Ok(artifact)
    }
}

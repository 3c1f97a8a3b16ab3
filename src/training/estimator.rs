//! Per-cluster estimator: the fitted feature pipeline plus the model chosen
//! for one cluster, persisted as a single JSON object.

use crate::error::{PipelineError, Result};
use crate::preprocessing::FeaturePipeline;
use crate::training::cross_validation::KFold;
use crate::training::regressor::Regressor;
use crate::utils::{column_to_array1, load_object, save_object};
use ndarray::{Array1, Axis};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcreteStrengthEstimator {
    pub cluster: usize,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub preprocessor: FeaturePipeline,
    pub model: Regressor,
}

impl ConcreteStrengthEstimator {
    pub fn new(
        cluster: usize,
        target_column: String,
        preprocessor: FeaturePipeline,
        model: Regressor,
    ) -> Self {
        Self {
            cluster,
            feature_columns: preprocessor.feature_columns().to_vec(),
            target_column,
            preprocessor,
            model,
        }
    }

    /// Positions of the rows of `df` this estimator's preprocessor assigns to its cluster
    pub fn cluster_row_indices(&self, df: &DataFrame) -> Result<Vec<usize>> {
        let (_, clusters) = self.preprocessor.transform_frame(df)?;
        Ok(clusters
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == self.cluster)
            .map(|(i, _)| i)
            .collect())
    }

    /// Predict the rows of `df` assigned to this cluster.
    ///
    /// Returns the predictions and the positions in `df` they belong to.
    pub fn predict(&self, df: &DataFrame) -> Result<(Array1<f64>, Vec<usize>)> {
        let (x, clusters) = self.preprocessor.transform_frame(df)?;
        let rows: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == self.cluster)
            .map(|(i, _)| i)
            .collect();
        if rows.is_empty() {
            return Ok((Array1::zeros(0), rows));
        }
        Ok((self.model.predict(&x.select(Axis(0), &rows))?, rows))
    }

    /// Mean k-fold R² of a fresh copy of the model on the given rows of `df`.
    ///
    /// The rows are taken as they are, whatever cluster this estimator's own
    /// preprocessor would put them in.
    pub fn cross_validated_r2(&self, df: &DataFrame, rows: &[usize], folds: usize) -> Result<f64> {
        if rows.len() < folds {
            return Err(PipelineError::TrainingError(format!(
                "Cluster {} has {} rows, fewer than {} folds",
                self.cluster,
                rows.len(),
                folds
            )));
        }

        let (x_all, _) = self.preprocessor.transform_frame(df)?;
        let x = x_all.select(Axis(0), rows);
        let y = column_to_array1(df, &self.target_column)?.select(Axis(0), rows);

        let cv = self.model.cross_val_score(&x, &y, &KFold::new(folds))?;
        debug!(cluster = self.cluster, model = %self.model, rows = rows.len(), r2 = cv.mean_score, "Cross-validated estimator");
        Ok(cv.mean_score)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_object(path)
    }
}

impl fmt::Display for ConcreteStrengthEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(cluster {})", self.model.name(), self.cluster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataTransformationConfig;
    use crate::training::linear_models::LinearRegression;
    use polars::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn frame() -> DataFrame {
        let a: Vec<f64> = (0..30).map(|i| 1.0 + i as f64).collect();
        let b: Vec<f64> = (0..30).map(|i| 5.0 + ((i * 7) % 11) as f64).collect();
        let y: Vec<f64> = a.iter().zip(&b).map(|(a, b)| 2.0 * a.ln_1p() + b.ln_1p()).collect();
        df!("a" => a, "b" => b, "strength" => y).unwrap()
    }

    fn estimator(df: &DataFrame) -> ConcreteStrengthEstimator {
        let config = DataTransformationConfig {
            transformed_train_dir: PathBuf::from("unused"),
            preprocessed_object_file_path: PathBuf::from("unused.json"),
            outlier_iqr_factor: 1.5,
            knn_neighbors: 3,
            // Single cluster keeps every row in play
            max_clusters: 1,
            random_state: 42,
        };
        let columns = vec!["a".to_string(), "b".to_string()];
        let mut pipeline = FeaturePipeline::new(columns.clone(), &config);
        let x = crate::utils::columns_to_array2(df, &columns).unwrap();
        let (scaled, _) = pipeline.fit_transform(&x).unwrap();

        let y = column_to_array1(df, "strength").unwrap();
        let mut model = Regressor::Linear(LinearRegression::new());
        model.fit(&scaled, &y).unwrap();
        ConcreteStrengthEstimator::new(0, "strength".to_string(), pipeline, model)
    }

    #[test]
    fn test_predict_returns_cluster_rows() {
        let df = frame();
        let est = estimator(&df);
        let (pred, rows) = est.predict(&df).unwrap();
        assert_eq!(rows.len(), 30);
        assert_eq!(pred.len(), 30);
        let y = column_to_array1(&df, "strength").unwrap();
        assert!((pred[0] - y[0]).abs() < 1e-6);
    }

    #[test]
    fn test_other_cluster_predicts_nothing() {
        let df = frame();
        let mut est = estimator(&df);
        est.cluster = 3;
        let (pred, rows) = est.predict(&df).unwrap();
        assert!(rows.is_empty());
        assert_eq!(pred.len(), 0);
    }

    #[test]
    fn test_cross_validated_r2_on_exact_relation() {
        let df = frame();
        let est = estimator(&df);
        let rows = est.cluster_row_indices(&df).unwrap();
        assert_eq!(rows.len(), 30);
        let r2 = est.cross_validated_r2(&df, &rows, 3).unwrap();
        assert!(r2 > 0.999);
    }

    #[test]
    fn test_cross_validated_r2_scores_rows_outside_own_cluster() {
        let df = frame();
        let mut est = estimator(&df);
        est.cluster = 3;
        assert!(est.cluster_row_indices(&df).unwrap().is_empty());

        // Rows chosen elsewhere are scored even though none map to cluster 3
        let rows: Vec<usize> = (0..15).collect();
        let r2 = est.cross_validated_r2(&df, &rows, 3).unwrap();
        assert!(r2 > 0.99);

        let err = est.cross_validated_r2(&df, &rows[..2], 3).unwrap_err();
        assert!(matches!(err, PipelineError::TrainingError(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model_cluster0.json");
        let df = frame();
        let est = estimator(&df);
        est.save(&path).unwrap();

        let restored = ConcreteStrengthEstimator::load(&path).unwrap();
        assert_eq!(restored.cluster, 0);
        assert_eq!(restored.to_string(), "LinearRegression(cluster 0)");
        let (restored_pred, _) = restored.predict(&df).unwrap();
        let (pred, _) = est.predict(&df).unwrap();
        for (a, b) in restored_pred.iter().zip(pred.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}

//! Fitted feature pipeline persisted alongside the trained models

use super::{
    ClusterGenerator, FeatureTransform, KNNImputer, Log1pTransformer, OutlierImputer, StandardScaler,
};
use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result};
use crate::utils::{columns_to_array2, load_object, save_object};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Outlier masking, imputation, log transform, scaling and cluster
/// assignment over a fixed list of feature columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePipeline {
    feature_columns: Vec<String>,
    outlier_imputer: OutlierImputer,
    nan_imputer: KNNImputer,
    log_transformation: Log1pTransformer,
    std_scaler: StandardScaler,
    cluster_generator: ClusterGenerator,
    is_fitted: bool,
}

impl FeaturePipeline {
    pub fn new(feature_columns: Vec<String>, config: &DataTransformationConfig) -> Self {
        Self {
            feature_columns,
            outlier_imputer: OutlierImputer::new(config.outlier_iqr_factor),
            nan_imputer: KNNImputer::new(config.knn_neighbors),
            log_transformation: Log1pTransformer::new(),
            std_scaler: StandardScaler::new(),
            cluster_generator: ClusterGenerator::new(config.max_clusters, config.random_state),
            is_fitted: false,
        }
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn number_of_clusters(&self) -> usize {
        self.cluster_generator.number_of_clusters()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn transform_features(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let x = self.outlier_imputer.transform(x)?;
        let x = self.nan_imputer.transform(&x)?;
        let x = self.log_transformation.transform(&x)?;
        self.std_scaler.transform(&x)
    }

    /// Fit every step on `x`; returns the transformed features and cluster labels
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<(Array2<f64>, Array1<usize>)> {
        if x.ncols() != self.feature_columns.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.feature_columns.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let masked = self.outlier_imputer.fit_transform(x)?;
        let n_masked = masked.iter().filter(|v| v.is_nan()).count() - x.iter().filter(|v| v.is_nan()).count();
        debug!(n_masked, "Converted outliers to NaN");

        let imputed = self.nan_imputer.fit_transform(&masked)?;
        let logged = self.log_transformation.fit_transform(&imputed)?;
        let scaled = self.std_scaler.fit_transform(&logged)?;
        let clusters = self.cluster_generator.fit_predict(&scaled)?;

        self.is_fitted = true;
        Ok((scaled, clusters))
    }

    /// Apply the fitted steps to new rows
    pub fn transform(&self, x: &Array2<f64>) -> Result<(Array2<f64>, Array1<usize>)> {
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        let scaled = self.transform_features(x)?;
        let clusters = self.cluster_generator.predict(&scaled)?;
        Ok((scaled, clusters))
    }

    /// Pull the feature columns out of `df` and transform them
    pub fn transform_frame(&self, df: &DataFrame) -> Result<(Array2<f64>, Array1<usize>)> {
        let x = columns_to_array2(df, &self.feature_columns)?;
        self.transform(&x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_object(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config() -> DataTransformationConfig {
        DataTransformationConfig {
            transformed_train_dir: PathBuf::from("unused"),
            preprocessed_object_file_path: PathBuf::from("unused.json"),
            outlier_iqr_factor: 1.5,
            knn_neighbors: 3,
            max_clusters: 5,
            random_state: 42,
        }
    }

    fn features() -> Array2<f64> {
        Array2::from_shape_fn((24, 2), |(i, j)| {
            let base = if i % 2 == 0 { 10.0 } else { 200.0 };
            base + ((i * 3 + j * 5) % 7) as f64
        })
    }

    #[test]
    fn test_fit_transform_outputs() {
        let mut pipeline = FeaturePipeline::new(vec!["a".to_string(), "b".to_string()], &config());
        let (scaled, clusters) = pipeline.fit_transform(&features()).unwrap();

        assert_eq!(scaled.dim(), (24, 2));
        assert_eq!(clusters.len(), 24);
        assert!(scaled.iter().all(|v| v.is_finite()));
        let mean0 = scaled.column(0).sum() / 24.0;
        assert!(mean0.abs() < 1e-9);
        assert!(pipeline.number_of_clusters() >= 1);
    }

    #[test]
    fn test_transform_matches_fit_on_training_rows() {
        let mut pipeline = FeaturePipeline::new(vec!["a".to_string(), "b".to_string()], &config());
        let x = features();
        let (scaled, clusters) = pipeline.fit_transform(&x).unwrap();
        let (again, again_clusters) = pipeline.transform(&x).unwrap();

        assert_eq!(clusters, again_clusters);
        for (a, b) in scaled.iter().zip(again.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_transform_frame_and_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessed.json");

        let mut pipeline = FeaturePipeline::new(vec!["a".to_string(), "b".to_string()], &config());
        let x = features();
        pipeline.fit_transform(&x).unwrap();
        pipeline.save(&path).unwrap();

        let restored = FeaturePipeline::load(&path).unwrap();
        let df = df!(
            "b" => x.column(1).to_vec(),
            "a" => x.column(0).to_vec()
        )
        .unwrap();
        let (from_frame, _) = restored.transform_frame(&df).unwrap();
        let (direct, _) = pipeline.transform(&x).unwrap();
        for (a, b) in from_frame.iter().zip(direct.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unfitted_transform() {
        let pipeline = FeaturePipeline::new(vec!["a".to_string()], &config());
        assert!(matches!(
            pipeline.transform(&Array2::zeros((1, 1))),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}

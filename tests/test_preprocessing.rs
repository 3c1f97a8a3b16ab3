//! Integration test: feature pipeline on a concrete-like dataset

mod common;

use common::concrete_frame;
use concrete_strength::config::DataTransformationConfig;
use concrete_strength::preprocessing::{find_knee, FeaturePipeline};
use concrete_strength::utils::columns_to_array2;
use concrete_strength::PipelineError;
use ndarray::{Array2, Axis};
use tempfile::TempDir;

fn config(dir: &TempDir) -> DataTransformationConfig {
    DataTransformationConfig {
        transformed_train_dir: dir.path().join("train"),
        preprocessed_object_file_path: dir.path().join("preprocessed.json"),
        outlier_iqr_factor: 1.5,
        knn_neighbors: 3,
        max_clusters: 6,
        random_state: 42,
    }
}

fn columns() -> Vec<String> {
    vec!["age".to_string(), "cement".to_string(), "water".to_string()]
}

fn features() -> Array2<f64> {
    columns_to_array2(&concrete_frame(60), &columns()).unwrap()
}

#[test]
fn test_fit_transform_scales_and_clusters() {
    let dir = TempDir::new().unwrap();
    let mut x = features();
    x[[4, 1]] = f64::NAN;
    x[[9, 2]] = f64::NAN;

    let mut pipeline = FeaturePipeline::new(columns(), &config(&dir));
    let (scaled, clusters) = pipeline.fit_transform(&x).unwrap();

    assert!(pipeline.is_fitted());
    assert_eq!(scaled.dim(), (60, 3));
    assert!(scaled.iter().all(|v| v.is_finite()));
    for mean in scaled.mean_axis(Axis(0)).unwrap().iter() {
        assert!(mean.abs() < 1e-9);
    }

    // The two mixes never share a cluster
    let k = pipeline.number_of_clusters();
    assert!(k >= 2);
    assert!(clusters.iter().all(|&c| c < k));
    for (i, ci) in clusters.iter().enumerate() {
        for (j, cj) in clusters.iter().enumerate() {
            if i % 2 != j % 2 {
                assert_ne!(ci, cj, "rows {} and {} share cluster {}", i, j, ci);
            }
        }
    }
}

#[test]
fn test_outlier_is_imputed_from_neighbours() {
    let dir = TempDir::new().unwrap();
    let mut x = features();
    x[[10, 1]] = 1.0e6;

    let mut pipeline = FeaturePipeline::new(columns(), &config(&dir));
    let (scaled, _) = pipeline.fit_transform(&x).unwrap();

    // The masked value lands among its mix instead of far outside it
    let cement = scaled.column(1);
    let max = cement.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(max < 3.0, "max scaled cement {}", max);
}

#[test]
fn test_saved_pipeline_reproduces_transform() {
    let dir = TempDir::new().unwrap();
    let cfg = config(&dir);
    let x = features();

    let mut pipeline = FeaturePipeline::new(columns(), &cfg);
    let (fitted, fitted_clusters) = pipeline.fit_transform(&x).unwrap();
    pipeline.save(&cfg.preprocessed_object_file_path).unwrap();

    let restored = FeaturePipeline::load(&cfg.preprocessed_object_file_path).unwrap();
    assert_eq!(restored.feature_columns(), columns().as_slice());
    let (again, clusters) = restored.transform_frame(&concrete_frame(60)).unwrap();

    assert_eq!(clusters, fitted_clusters);
    for (a, b) in again.iter().zip(fitted.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_transform_before_fit_fails() {
    let dir = TempDir::new().unwrap();
    let pipeline = FeaturePipeline::new(columns(), &config(&dir));
    assert!(matches!(pipeline.transform(&features()), Err(PipelineError::ModelNotFitted)));
}

#[test]
fn test_wrong_feature_count_is_a_shape_error() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = FeaturePipeline::new(columns(), &config(&dir));
    let x = Array2::from_elem((10, 2), 1.0);
    assert!(matches!(pipeline.fit_transform(&x), Err(PipelineError::ShapeError { .. })));
}

#[test]
fn test_knee_of_two_blob_inertia_curve() {
    let ks: Vec<f64> = (1..=6).map(|k| k as f64).collect();
    let inertias = vec![180.0, 7.8, 6.2, 4.7, 3.9, 3.1];
    assert_eq!(find_knee(&ks, &inertias), Some(2.0));
}

//! Integration test: full pipeline (ingest → validate → transform → train → evaluate → push)

mod common;

use common::{configuration, write_project, DATASET_FILE};
use concrete_strength::components::EvaluationReport;
use concrete_strength::pipeline::Pipeline;
use concrete_strength::training::ConcreteStrengthEstimator;
use concrete_strength::utils::read_csv;
use concrete_strength::PipelineError;
use polars::prelude::*;
use tempfile::TempDir;

const FIRST_RUN: &str = "2001-01-01-00-00-00";

fn evaluation_report(root: &std::path::Path, cluster: usize) -> EvaluationReport {
    let path = root
        .join("concrete/artifact/model_evaluation")
        .join(format!("model_evaluation_cluster{}.yaml", cluster));
    EvaluationReport::load(&path).unwrap()
}

#[test]
fn test_first_run_accepts_and_pushes_every_cluster() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 0.6);

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let outcome = pipeline.run_pipeline().unwrap();

    assert!(outcome.data_ingestion.is_ingested);
    assert!(outcome.data_validation.is_validated);
    assert!(outcome.data_transformation.is_transformed);

    // Transformed data: scaled features, the cluster label and the raw target
    let transformed = read_csv(&outcome.data_transformation.transformed_train_file_path).unwrap();
    let names: Vec<&str> = transformed.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["age", "cement", "water", "cluster", "strength"]);
    assert_eq!(transformed.height(), 60);

    let trainer = &outcome.model_trainer;
    assert!(trainer.is_trained);
    assert!(!trainer.clusters.is_empty());
    assert_eq!(trainer.trained_model_paths.len(), trainer.clusters.len());
    for cluster in &trainer.clusters {
        assert!(trainer.model_accuracy[cluster] >= 0.6);
        assert!(trainer.train_accuracy[cluster] > 0.99);
    }

    // No champion yet: every cluster is accepted and exported
    let evaluation = &outcome.model_evaluation;
    assert_eq!(evaluation.accepted_clusters(), trainer.clusters);

    let pusher = outcome.model_pusher.as_ref().expect("accepted models are pushed");
    for cluster in &trainer.clusters {
        assert!(pusher.is_models_pushed[cluster]);
        let exported = pusher.export_model_file_paths[cluster].as_ref().unwrap();
        assert!(exported.starts_with(dir.path().join("saved_models")));
        assert!(exported.is_file());

        let report = evaluation_report(dir.path(), *cluster);
        assert_eq!(report.best_model.unwrap().model_path, trainer.trained_model_paths[cluster]);
        assert!(report.history.is_empty());
    }

    assert_eq!(outcome.experiment.is_model_accepted, Some(true));
    assert!(!outcome.experiment.running_status);
    assert_eq!(outcome.experiment.message, "Pipeline has been completed.");
    assert!(!pipeline.is_running());
}

#[test]
fn test_identical_rerun_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 0.6);

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let first = pipeline.run_pipeline().unwrap();
    let second = pipeline.run_pipeline().unwrap();

    assert_ne!(first.experiment.artifact_time_stamp, second.experiment.artifact_time_stamp);
    assert_ne!(first.experiment.experiment_id, second.experiment.experiment_id);

    // Same data and search space produce the same model, and a tie keeps the champion
    assert_eq!(second.model_trainer.clusters, first.model_trainer.clusters);
    assert!(!second.model_evaluation.any_accepted());
    assert!(second.model_pusher.is_none());
    assert_eq!(second.experiment.is_model_accepted, Some(false));

    for cluster in &first.model_trainer.clusters {
        let report = evaluation_report(dir.path(), *cluster);
        assert_eq!(
            report.best_model.unwrap().model_path,
            first.model_trainer.trained_model_paths[cluster]
        );
        assert!(report.history.is_empty());
    }

    // Start and stop rows for both runs
    let log = pipeline.experiment_log().read(None).unwrap();
    assert_eq!(log.height(), 4);
}

#[test]
fn test_back_to_back_runs_keep_the_champion_file() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 0.6);

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let first = pipeline.run_pipeline().unwrap();
    let champion_bytes: Vec<Vec<u8>> = first
        .model_trainer
        .trained_model_paths
        .values()
        .map(|path| std::fs::read(path).unwrap())
        .collect();

    let mut stamps = vec![first.experiment.artifact_time_stamp.clone()];
    for _ in 0..3 {
        stamps.push(pipeline.run_pipeline().unwrap().experiment.artifact_time_stamp);
    }
    // A separate pipeline configured with the same stamp
    let other = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let rerun = other.run_pipeline().unwrap();
    assert_eq!(rerun.experiment.artifact_time_stamp, format!("{}-1", FIRST_RUN));
    assert!(!rerun.model_evaluation.any_accepted());
    stamps.push(rerun.experiment.artifact_time_stamp);

    let unique: std::collections::BTreeSet<_> = stamps.iter().collect();
    assert_eq!(unique.len(), stamps.len(), "reused time stamp in {:?}", stamps);

    let after: Vec<Vec<u8>> = first
        .model_trainer
        .trained_model_paths
        .values()
        .map(|path| std::fs::read(path).unwrap())
        .collect();
    assert_eq!(after, champion_bytes);
    for cluster in &first.model_trainer.clusters {
        let report = evaluation_report(dir.path(), *cluster);
        assert_eq!(
            report.best_model.unwrap().model_path,
            first.model_trainer.trained_model_paths[cluster]
        );
    }
}

#[test]
fn test_exported_model_predicts_raw_rows() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 0.6);

    let outcome = Pipeline::new(configuration(dir.path(), FIRST_RUN))
        .unwrap()
        .run_pipeline()
        .unwrap();
    let pusher = outcome.model_pusher.unwrap();

    let raw = read_csv(&dir.path().join(DATASET_FILE)).unwrap();
    let truth = raw.column("strength").unwrap().f64().unwrap().clone();

    let mut covered = 0;
    for path in pusher.export_model_file_paths.values().flatten() {
        let estimator = ConcreteStrengthEstimator::load(path).unwrap();
        let features = raw.select(["age", "cement", "water"]).unwrap();
        let (predictions, rows) = estimator.predict(&features).unwrap();
        for (pred, row) in predictions.iter().zip(&rows) {
            let expected = truth.get(*row).unwrap();
            assert!((pred - expected).abs() < 0.5, "row {}: {} vs {}", row, pred, expected);
        }
        covered += rows.len();
    }
    // Every row belongs to exactly one cluster
    assert_eq!(covered, raw.height());
}

#[test]
fn test_missing_dataset_fails_in_ingestion() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), "data/missing.csv", 0.6);

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let err = pipeline.run_pipeline().unwrap_err();

    assert!(matches!(err, PipelineError::Stage { stage: "data_ingestion", .. }));
    assert!(matches!(err.root_cause(), PipelineError::DataError(_)));
    assert!(err.to_string().contains("data_ingestion failed"));
    assert!(!pipeline.is_running());

    let log = pipeline.experiment_log().read(None).unwrap();
    assert_eq!(log.height(), 2);
    let message = log.column("message").unwrap().str().unwrap().get(1).unwrap().to_string();
    assert!(message.starts_with("Pipeline failed"));

    let experiment = pipeline.experiment().unwrap();
    assert!(!experiment.running_status);
    assert_eq!(experiment.is_model_accepted, None);
}

#[test]
fn test_unreachable_base_accuracy_fails_training() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 1.5);

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let err = pipeline.run_pipeline().unwrap_err();

    assert!(matches!(err, PipelineError::Stage { stage: "model_trainer", .. }));
    assert!(matches!(err.root_cause(), PipelineError::NoAcceptableModel { .. }));
}

#[test]
fn test_schema_mismatch_fails_validation() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path(), DATASET_FILE, 0.6);

    // Drop a column from the dataset
    let path = dir.path().join(DATASET_FILE);
    let mut df = read_csv(&path).unwrap().drop("water").unwrap();
    concrete_strength::utils::write_csv(&mut df, &path).unwrap();

    let pipeline = Pipeline::new(configuration(dir.path(), FIRST_RUN)).unwrap();
    let err = pipeline.run_pipeline().unwrap_err();

    assert!(matches!(err, PipelineError::Stage { stage: "data_validation", .. }));
    assert!(matches!(err.root_cause(), PipelineError::ValidationError(_)));
}

//! Shared fixtures: a synthetic concrete dataset and a project layout
//! (config.yaml, schema.yaml, model.yaml) written into a temp directory.

#![allow(dead_code)]

use concrete_strength::config::Configuration;
use concrete_strength::utils::write_csv;
use polars::prelude::*;
use std::fs;
use std::path::Path;

pub const DATASET_FILE: &str = "data/concrete.csv";

/// Two mixes far apart in every feature. Inside a mix the strength is an
/// exact linear function of the log features, so a linear model fits each
/// cluster almost perfectly.
pub fn concrete_frame(n: usize) -> DataFrame {
    let mut cement = Vec::with_capacity(n);
    let mut water = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut strength = Vec::with_capacity(n);

    for i in 0..n {
        let (c, w, a) = if i % 2 == 0 {
            (
                150.0 + ((i * 17) % 23) as f64 * 2.0,
                200.0 + ((i * 7) % 13) as f64 * 2.0,
                14.0 + ((i * 11) % 19) as f64,
            )
        } else {
            (
                450.0 + ((i * 17) % 23) as f64 * 4.0,
                140.0 + ((i * 7) % 13) as f64 * 2.0,
                90.0 + ((i * 11) % 19) as f64 * 3.0,
            )
        };
        cement.push(c);
        water.push(w);
        age.push(a);
        strength.push(60.0 + 12.0 * f64::ln_1p(c) - 20.0 * f64::ln_1p(w) + 9.0 * f64::ln_1p(a));
    }

    df!(
        "cement" => cement,
        "water" => water,
        "age" => age,
        "strength" => strength
    )
    .unwrap()
}

pub const SCHEMA_YAML: &str = r#"
columns:
  age: float64
  cement: float64
  strength: float64
  water: float64
target_column: strength
"#;

pub const LINEAR_MODEL_YAML: &str = r#"
grid_search:
  cv: 3
models:
  module_0:
    class: LinearRegression
  module_1:
    class: Ridge
    search_param_grid:
      alpha: [0.001, 0.01]
"#;

pub fn config_yaml(dataset_source: &str, base_accuracy: f64) -> String {
    format!(
        r#"
training_pipeline_config:
  pipeline_name: concrete
  artifact_dir: artifact
data_ingestion_config:
  dataset_name: concrete-compressive-strength
  dataset_source: {dataset_source}
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
  max_clusters: 6
model_trainer_config:
  trained_model_dir: trained_model
  base_accuracy: {base_accuracy}
  model_config_dir: config
  model_config_file_name: model.yaml
  cv_folds: 3
model_evaluation_config:
  model_evaluation_file_prefix: model_evaluation_cluster
  cv_folds: 3
model_pusher_config:
  model_export_dir: saved_models
"#
    )
}

/// Write the config files under `root/config` and the dataset at
/// [`DATASET_FILE`]
pub fn write_project(root: &Path, dataset_source: &str, base_accuracy: f64) {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.yaml"), config_yaml(dataset_source, base_accuracy)).unwrap();
    fs::write(config_dir.join("schema.yaml"), SCHEMA_YAML).unwrap();
    fs::write(config_dir.join("model.yaml"), LINEAR_MODEL_YAML).unwrap();

    let mut df = concrete_frame(60);
    write_csv(&mut df, &root.join(DATASET_FILE)).unwrap();
}

pub fn configuration(root: &Path, time_stamp: &str) -> Configuration {
    Configuration::with_time_stamp(
        &root.join("config").join("config.yaml"),
        root,
        time_stamp.to_string(),
    )
    .unwrap()
}

pub fn dataset_csv() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("concrete.csv");
    let mut df = concrete_frame(60);
    write_csv(&mut df, &path).unwrap();
    fs::read_to_string(&path).unwrap()
}

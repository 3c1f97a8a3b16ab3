//! Experiment record and the CSV experiment log

use crate::error::{PipelineError, Result};
use crate::utils::read_csv;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// State of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub initialization_timestamp: String,
    pub artifact_time_stamp: String,
    pub running_status: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub execution_time_secs: Option<f64>,
    pub message: String,
    pub experiment_file_path: PathBuf,
    pub accuracy: Option<f64>,
    pub is_model_accepted: Option<bool>,
}

impl Experiment {
    /// Begin a new run with a fresh id
    pub fn start(time_stamp: &str, experiment_file_path: &Path, message: &str) -> Self {
        Self {
            experiment_id: Uuid::new_v4().to_string(),
            initialization_timestamp: time_stamp.to_string(),
            artifact_time_stamp: time_stamp.to_string(),
            running_status: true,
            start_time: Some(Utc::now()),
            stop_time: None,
            execution_time_secs: None,
            message: message.to_string(),
            experiment_file_path: experiment_file_path.to_path_buf(),
            accuracy: None,
            is_model_accepted: None,
        }
    }

    /// Mark the run finished
    pub fn stop(&mut self, message: &str, is_model_accepted: Option<bool>, accuracy: Option<f64>) {
        let stop_time = Utc::now();
        self.running_status = false;
        self.execution_time_secs = self
            .start_time
            .map(|start| (stop_time - start).num_milliseconds() as f64 / 1000.0);
        self.stop_time = Some(stop_time);
        self.message = message.to_string();
        self.is_model_accepted = is_model_accepted;
        self.accuracy = accuracy;
    }

    fn to_row(&self) -> Result<DataFrame> {
        let file_name = self
            .experiment_file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let start = self.start_time.map(|t| t.to_rfc3339());
        let stop = self.stop_time.map(|t| t.to_rfc3339());

        let df = DataFrame::new(vec![
            Column::new("experiment_id".into(), &[self.experiment_id.as_str()]),
            Column::new("initialization_timestamp".into(), &[self.initialization_timestamp.as_str()]),
            Column::new("artifact_time_stamp".into(), &[self.artifact_time_stamp.as_str()]),
            Column::new("running_status".into(), &[self.running_status]),
            Column::new("start_time".into(), &[start.as_deref()]),
            Column::new("stop_time".into(), &[stop.as_deref()]),
            Column::new("execution_time".into(), &[self.execution_time_secs]),
            Column::new("message".into(), &[self.message.as_str()]),
            Column::new("experiment_file_path".into(), &[file_name.as_str()]),
            Column::new("accuracy".into(), &[self.accuracy]),
            Column::new("is_model_accepted".into(), &[self.is_model_accepted]),
            Column::new("created_time_stamp".into(), &[Utc::now().to_rfc3339().as_str()]),
        ])?;
        Ok(df)
    }
}

/// Append-only CSV log of experiment snapshots
#[derive(Debug, Clone)]
pub struct ExperimentLog {
    file_path: PathBuf,
}

impl ExperimentLog {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Append one row; the header is written only when the file is new
    pub fn append(&self, experiment: &Experiment) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let is_new = !self.file_path.exists();
        let mut row = experiment.to_row()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        CsvWriter::new(&mut file)
            .include_header(is_new)
            .finish(&mut row)
            .map_err(|e| PipelineError::DataError(e.to_string()))
    }

    /// Most recent `limit` rows, or an empty frame when nothing was logged yet
    pub fn read(&self, limit: Option<usize>) -> Result<DataFrame> {
        if !self.file_path.exists() {
            return Ok(DataFrame::empty());
        }
        let df = read_csv(&self.file_path)?;
        Ok(match limit {
            Some(n) => df.tail(Some(n)),
            None => df,
        })
    }
}

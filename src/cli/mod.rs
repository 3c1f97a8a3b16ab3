//! Concrete strength pipeline CLI
//!
//! Command-line interface for running the training pipeline, browsing the
//! experiment log and predicting with a trained cluster model.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Configuration;
use crate::entity::ExperimentLog;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::training::ConcreteStrengthEstimator;
use crate::utils::{read_csv, write_csv};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn yes_no(flag: bool) -> ColoredString {
    if flag { ok("yes") } else { "no".yellow() }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "concrete")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Training pipeline for concrete compressive strength models")]
#[command(long_about = None)]
pub struct Cli {
    /// Also write logs to a time-stamped file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline once
    Run {
        /// Pipeline configuration file
        #[arg(short, long, default_value = "config/config.yaml")]
        config: PathBuf,

        /// Root directory for relative paths in the configuration
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Show recorded experiments
    Experiments {
        /// Pipeline configuration file
        #[arg(short, long, default_value = "config/config.yaml")]
        config: PathBuf,

        /// Root directory for relative paths in the configuration
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Only show the most recent N experiments
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Predict with a trained cluster model
    Predict {
        /// Trained model file (model_cluster<N>.json)
        #[arg(short, long)]
        model: PathBuf,

        /// Raw input rows (CSV with the feature columns)
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

// ─── Run ───────────────────────────────────────────────────────────────────────

pub fn cmd_run(config_path: &Path, root: &Path) -> anyhow::Result<()> {
    section("Training pipeline");

    let config = Configuration::new(config_path, root)?;
    let pipeline = Pipeline::new(config)?;

    let experiment = pipeline.start()?;
    println!("  {:<16} {}", muted("Experiment"), experiment.experiment_id.white());
    println!("  {:<16} {}", muted("Time stamp"), experiment.artifact_time_stamp.white());
    println!();

    step_run("Running stages");
    let start = Instant::now();
    let outcome = pipeline.wait()?;
    step_done(&format!("{:.1?}", start.elapsed()));

    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome) {
    section("Clusters");
    println!(
        "  {:<8} {:>10} {:>10} {:>10} {:>9} {:>7}",
        muted("Cluster"),
        muted("CV R²"),
        muted("Train R²"),
        muted("RMSE"),
        muted("Accepted"),
        muted("Pushed")
    );
    println!("  {}", dim(&"─".repeat(60)));

    let trainer = &outcome.model_trainer;
    for cluster in &trainer.clusters {
        let accepted = outcome
            .model_evaluation
            .is_models_accepted
            .get(cluster)
            .copied()
            .unwrap_or(false);
        let pushed = outcome
            .model_pusher
            .as_ref()
            .and_then(|p| p.is_models_pushed.get(cluster).copied())
            .unwrap_or(false);
        println!(
            "  {:<8} {:>10.4} {:>10.4} {:>10.4} {:>9} {:>7}",
            cluster,
            trainer.model_accuracy.get(cluster).copied().unwrap_or(f64::NAN),
            trainer.train_accuracy.get(cluster).copied().unwrap_or(f64::NAN),
            trainer.train_rmse.get(cluster).copied().unwrap_or(f64::NAN),
            yes_no(accepted),
            yes_no(pushed)
        );
    }

    println!();
    if let Some(accuracy) = outcome.experiment.accuracy {
        println!("  {:<16} {}", muted("Mean CV R²"), format!("{:.4}", accuracy).white().bold());
    }
    println!("  {:<16} {}", muted("Message"), outcome.experiment.message.white());
    println!();
}

// ─── Experiments ───────────────────────────────────────────────────────────────

const EXPERIMENT_COLUMNS: [&str; 6] = [
    "experiment_id",
    "artifact_time_stamp",
    "running_status",
    "execution_time",
    "accuracy",
    "is_model_accepted",
];

pub fn cmd_experiments(config_path: &Path, root: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    section("Experiments");

    let config = Configuration::new(config_path, root)?;
    let log = ExperimentLog::new(config.experiment_file_path());
    let df = log.read(limit)?;

    if df.height() == 0 {
        println!("  {}", "No experiments recorded yet".yellow());
        println!();
        return Ok(());
    }

    let header: Vec<String> = EXPERIMENT_COLUMNS.iter().map(|c| muted(c).to_string()).collect();
    println!("  {}", header.join("  "));
    println!("  {}", dim(&"─".repeat(100)));

    for i in 0..df.height() {
        let mut cells = Vec::with_capacity(EXPERIMENT_COLUMNS.len());
        for name in EXPERIMENT_COLUMNS {
            let value = match df.column(name) {
                Ok(col) => col.get(i)?.to_string(),
                Err(_) => String::new(),
            };
            cells.push(value);
        }
        println!("  {}", cells.join("  "));
    }

    println!();
    println!("  {:<12} {}", muted("Log file"), log.file_path().display());
    println!();
    Ok(())
}

// ─── Predict ───────────────────────────────────────────────────────────────────

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let estimator = ConcreteStrengthEstimator::load(model_path)?;
    step_done(&estimator.to_string());

    step_run("Loading data");
    let df = read_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Predicting");
    let (predictions, rows) = estimator.predict(&df)?;
    step_done(&format!("{} of {} rows in cluster {}", rows.len(), df.height(), estimator.cluster));

    let row_index: Vec<i64> = rows.iter().map(|&r| r as i64).collect();
    let mut out = DataFrame::new(vec![
        Column::new("row_index".into(), row_index),
        Column::new("prediction".into(), predictions.to_vec()),
    ])?;

    match output {
        Some(path) => {
            write_csv(&mut out, path)?;
            println!("  {:<12} {}", muted("Saved"), path.display());
        }
        None => {
            println!();
            for (row, value) in rows.iter().zip(predictions.iter()) {
                println!("  {:<8} {:.4}", row, value);
            }
        }
    }
    println!();
    Ok(())
}

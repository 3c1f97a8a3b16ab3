//! Training pipeline orchestration
//!
//! Runs ingestion, validation, transformation, training, evaluation and
//! (when any cluster's model was accepted) pushing, in that order. A run can
//! execute on the calling thread ([`Pipeline::run_pipeline`]) or on a single
//! background worker ([`Pipeline::start`]); only one run is active at a time.

use crate::components::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher, ModelTrainer,
};
use crate::config::Configuration;
use crate::entity::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact, Experiment,
    ExperimentLog, ModelEvaluationArtifact, ModelPusherArtifact, ModelTrainerArtifact,
};
use crate::error::{PipelineError, Result, StageContext};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Artifacts of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub experiment: Experiment,
    pub data_ingestion: DataIngestionArtifact,
    pub data_validation: DataValidationArtifact,
    pub data_transformation: DataTransformationArtifact,
    pub model_trainer: ModelTrainerArtifact,
    pub model_evaluation: ModelEvaluationArtifact,
    /// `None` when every trained model was rejected
    pub model_pusher: Option<ModelPusherArtifact>,
}

struct StageArtifacts {
    data_ingestion: DataIngestionArtifact,
    data_validation: DataValidationArtifact,
    data_transformation: DataTransformationArtifact,
    model_trainer: ModelTrainerArtifact,
    model_evaluation: ModelEvaluationArtifact,
    model_pusher: Option<ModelPusherArtifact>,
}

#[derive(Default)]
struct PipelineState {
    running: bool,
    runs: usize,
    experiment: Option<Experiment>,
    worker: Option<JoinHandle<Result<PipelineOutcome>>>,
}

struct PipelineInner {
    config: Configuration,
    experiment_log: ExperimentLog,
    state: Mutex<PipelineState>,
}

/// Clears the running flag when a run ends, including by panic
struct RunningGuard<'a> {
    inner: &'a PipelineInner,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.inner.state.lock().running = false;
    }
}

/// Cheap to clone; clones share the same run state
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

impl Pipeline {
    pub fn new(config: Configuration) -> Result<Self> {
        fs::create_dir_all(config.training_pipeline_config().artifact_dir)?;
        let experiment_log = ExperimentLog::new(config.experiment_file_path());
        Ok(Self {
            inner: Arc::new(PipelineInner {
                config,
                experiment_log,
                state: Mutex::new(PipelineState::default()),
            }),
        })
    }

    pub fn experiment_log(&self) -> &ExperimentLog {
        &self.inner.experiment_log
    }

    /// The current or most recent experiment
    pub fn experiment(&self) -> Option<Experiment> {
        self.inner.state.lock().experiment.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().running
    }

    /// Claim the run slot and open a new experiment. The first run uses the
    /// configured time stamp; later runs get a fresh one. Either is suffixed
    /// when an earlier run already has artifacts under it.
    fn begin_run(state: &mut PipelineState, config: &Configuration) -> (Configuration, Experiment) {
        let run_config = if state.runs == 0 { config.unused() } else { config.refreshed() };
        let experiment = Experiment::start(
            run_config.time_stamp(),
            &run_config.experiment_file_path(),
            "Pipeline has been started.",
        );
        state.runs += 1;
        state.running = true;
        state.experiment = Some(experiment.clone());
        (run_config, experiment)
    }

    /// Launch a run on the background worker.
    ///
    /// While a run is in progress this starts nothing and returns the
    /// experiment of the active run.
    pub fn start(&self) -> Result<Experiment> {
        let mut state = self.inner.state.lock();
        if state.running {
            info!("Pipeline is already running");
            return state
                .experiment
                .clone()
                .ok_or_else(|| PipelineError::WorkerError("Running pipeline has no experiment".to_string()));
        }
        if let Some(previous) = state.worker.take() {
            // Finished but never waited on
            if let Ok(Err(err)) = previous.join() {
                warn!(error = %err, "Previous run ended with an error");
            }
        }

        let (run_config, experiment) = Self::begin_run(&mut state, &self.inner.config);
        let inner = Arc::clone(&self.inner);
        let spawn_experiment = experiment.clone();
        let handle = thread::Builder::new()
            .name("training-pipeline".to_string())
            .spawn(move || {
                let _guard = RunningGuard { inner: &*inner };
                inner.execute(&run_config, spawn_experiment)
            });

        match handle {
            Ok(handle) => {
                state.worker = Some(handle);
                info!(experiment_id = %experiment.experiment_id, "Pipeline started on background worker");
                Ok(experiment)
            }
            Err(err) => {
                state.running = false;
                Err(PipelineError::WorkerError(format!("Cannot spawn pipeline worker: {}", err)))
            }
        }
    }

    /// Block until the background run finishes and return its outcome
    pub fn wait(&self) -> Result<PipelineOutcome> {
        let handle = self
            .inner
            .state
            .lock()
            .worker
            .take()
            .ok_or_else(|| PipelineError::WorkerError("No pipeline run to wait for".to_string()))?;

        handle
            .join()
            .map_err(|_| PipelineError::WorkerError("Pipeline worker panicked".to_string()))?
    }

    /// Run every stage on the calling thread
    pub fn run_pipeline(&self) -> Result<PipelineOutcome> {
        let (run_config, experiment) = {
            let mut state = self.inner.state.lock();
            if state.running {
                return Err(PipelineError::WorkerError("Pipeline is already running".to_string()));
            }
            Self::begin_run(&mut state, &self.inner.config)
        };
        let _guard = RunningGuard { inner: &*self.inner };
        self.inner.execute(&run_config, experiment)
    }
}

impl PipelineInner {
    fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        self.state.lock().experiment = Some(experiment.clone());
        self.experiment_log.append(experiment).stage("experiment_log")
    }

    fn execute(&self, config: &Configuration, mut experiment: Experiment) -> Result<PipelineOutcome> {
        self.save_experiment(&experiment)?;
        info!(experiment_id = %experiment.experiment_id, time_stamp = %config.time_stamp(), "Pipeline starting");

        match run_stages(config) {
            Ok(stages) => {
                let accepted = stages.model_evaluation.any_accepted();
                let accuracy = stages.model_trainer.mean_model_accuracy();
                experiment.stop("Pipeline has been completed.", Some(accepted), accuracy);
                self.save_experiment(&experiment)?;
                info!(
                    experiment_id = %experiment.experiment_id,
                    accepted,
                    accuracy = ?accuracy,
                    execution_time_secs = ?experiment.execution_time_secs,
                    "Pipeline completed"
                );
                Ok(PipelineOutcome {
                    experiment,
                    data_ingestion: stages.data_ingestion,
                    data_validation: stages.data_validation,
                    data_transformation: stages.data_transformation,
                    model_trainer: stages.model_trainer,
                    model_evaluation: stages.model_evaluation,
                    model_pusher: stages.model_pusher,
                })
            }
            Err(err) => {
                error!(experiment_id = %experiment.experiment_id, error = %err, "Pipeline failed");
                experiment.stop(&format!("Pipeline failed: {}", err), None, None);
                if let Err(log_err) = self.save_experiment(&experiment) {
                    warn!(error = %log_err, "Could not record failed experiment");
                }
                Err(err)
            }
        }
    }
}

fn run_stages(config: &Configuration) -> Result<StageArtifacts> {
    let data_ingestion = DataIngestion::new(config.data_ingestion_config())
        .initiate_data_ingestion()
        .stage("data_ingestion")?;

    let data_validation = DataValidation::new(config.data_validation_config(), data_ingestion.clone())
        .initiate_data_validation()
        .stage("data_validation")?;

    let data_transformation = DataTransformation::new(
        config.data_transformation_config(),
        data_ingestion.clone(),
        data_validation.clone(),
    )
    .initiate_data_transformation()
    .stage("data_transformation")?;

    let model_trainer = ModelTrainer::new(config.model_trainer_config(), data_transformation.clone())
        .initiate_model_trainer()
        .stage("model_trainer")?;

    let model_evaluation = ModelEvaluation::new(
        config.model_evaluation_config(),
        data_ingestion.clone(),
        data_validation.clone(),
        model_trainer.clone(),
    )
    .initiate_model_evaluation()
    .stage("model_evaluation")?;

    let model_pusher = if model_evaluation.any_accepted() {
        Some(
            ModelPusher::new(config.model_pusher_config(), model_evaluation.clone())
                .initiate_model_pusher()
                .stage("model_pusher")?,
        )
    } else {
        info!("Trained models rejected");
        None
    };

    Ok(StageArtifacts {
        data_ingestion,
        data_validation,
        data_transformation,
        model_trainer,
        model_evaluation,
        model_pusher,
    })
}

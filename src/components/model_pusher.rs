//! Model pusher: copy accepted models into the export directory

use crate::config::ModelPusherConfig;
use crate::entity::{ModelEvaluationArtifact, ModelPusherArtifact};
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, info};

pub struct ModelPusher {
    config: ModelPusherConfig,
    model_evaluation_artifact: ModelEvaluationArtifact,
}

impl ModelPusher {
    pub fn new(config: ModelPusherConfig, model_evaluation_artifact: ModelEvaluationArtifact) -> Self {
        info!("Model pusher started");
        Self {
            config,
            model_evaluation_artifact,
        }
    }

    pub fn export_model(&self) -> Result<ModelPusherArtifact> {
        let export_dir = &self.config.export_dir;
        let mut is_models_pushed = BTreeMap::new();
        let mut export_model_file_paths = BTreeMap::new();

        for &cluster in &self.model_evaluation_artifact.clusters {
            let accepted = self
                .model_evaluation_artifact
                .is_models_accepted
                .get(&cluster)
                .copied()
                .unwrap_or(false);
            if !accepted {
                info!(cluster, "Trained model rejected and hence not pushed");
                is_models_pushed.insert(cluster, false);
                export_model_file_paths.insert(cluster, None);
                continue;
            }

            let source = self
                .model_evaluation_artifact
                .evaluated_model_paths
                .get(&cluster)
                .ok_or_else(|| PipelineError::DataError(format!("No evaluated model for cluster {}", cluster)))?;
            let file_name = source.file_name().ok_or_else(|| {
                PipelineError::DataError(format!("Invalid model path {}", source.display()))
            })?;
            let export_path = export_dir.join(file_name);
            debug!(path = %export_path.display(), "Exporting model file");

            fs::create_dir_all(export_dir)?;
            fs::copy(source, &export_path)?;
            info!(cluster, from = %source.display(), to = %export_path.display(), "Trained model copied to export dir");

            is_models_pushed.insert(cluster, true);
            export_model_file_paths.insert(cluster, Some(export_path));
        }

        Ok(ModelPusherArtifact {
            is_models_pushed,
            export_model_file_paths,
        })
    }

    pub fn initiate_model_pusher(&self) -> Result<ModelPusherArtifact> {
        let artifact = self.export_model()?;
        info!(?artifact, "Model pusher completed");
        Ok(artifact)
    }
}

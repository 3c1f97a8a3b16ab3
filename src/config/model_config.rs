//! Model search configuration (`model.yaml`)

use crate::error::{PipelineError, Result};
use crate::training::params::{ParamGrid, ParamSet};
use crate::utils::read_yaml_file;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Settings shared by every grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchSettings {
    /// Number of cross-validation folds
    #[serde(default = "default_cv")]
    pub cv: usize,
    /// Shuffle rows before splitting into folds
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub random_state: Option<u64>,
}

fn default_cv() -> usize {
    5
}

impl Default for GridSearchSettings {
    fn default() -> Self {
        Self {
            cv: default_cv(),
            shuffle: false,
            random_state: None,
        }
    }
}

/// One candidate model entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppliedModelConfig {
    /// Model class name, e.g. `RandomForestRegressor`
    pub class: String,
    /// Fixed hyperparameters applied before the search
    #[serde(default)]
    pub params: ParamSet,
    /// Values to search, one list per hyperparameter
    #[serde(default)]
    pub search_param_grid: ParamGrid,
}

/// Parsed `model.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub grid_search: GridSearchSettings,
    /// Serial key to model entry, iterated in key order
    pub models: BTreeMap<String, SuppliedModelConfig>,
}

impl ModelConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = read_yaml_file(path)?;
        if config.models.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "No models declared in {}",
                path.display()
            )));
        }
        if config.grid_search.cv < 2 {
            return Err(PipelineError::ConfigError(
                "grid_search.cv must be at least 2".to_string(),
            ));
        }
        Ok(config)
    }
}

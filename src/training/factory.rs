//! Model factory: builds the configured candidates, grid-searches each of
//! them and picks the model a cluster is trained with.
//!
//! Two selection rules are applied in sequence:
//! - [`ModelFactory::get_best_model_from_grid_searched_best_model_list`] keeps
//!   the candidate whose grid-search score is strictly above the running base
//!   accuracy, raising the base each time it accepts one.
//! - [`evaluate_regression_model`] rescores every grid-searched model with
//!   k-fold R² and keeps the last one at or above the running base.

use crate::config::ModelConfig;
use crate::error::{PipelineError, Result};
use crate::training::cross_validation::KFold;
use crate::training::grid_search::GridSearchCV;
use crate::training::metrics::RegressionMetrics;
use crate::training::params::{format_params, ParamGrid, ParamSet};
use crate::training::regressor::{ModelKind, Regressor};
use ndarray::{Array1, Array2};
use std::path::Path;
use tracing::{debug, info};

/// One configured model, ready to be searched
#[derive(Debug, Clone)]
pub struct ModelInitializationDetail {
    pub model_serial_number: String,
    pub kind: ModelKind,
    pub params: ParamSet,
    pub param_grid: ParamGrid,
    pub model_name: String,
}

/// Result of searching one configured model
#[derive(Debug, Clone)]
pub struct GridSearchedBestModel {
    pub model_serial_number: String,
    pub model_name: String,
    pub best_model: Regressor,
    pub best_parameters: ParamSet,
    pub best_score: f64,
}

#[derive(Debug, Clone)]
pub struct ClusterModelDetails {
    pub best_model: GridSearchedBestModel,
    pub grid_searched_best_model_list: Vec<GridSearchedBestModel>,
}

/// Scores of the model chosen by [`evaluate_regression_model`]
#[derive(Debug, Clone)]
pub struct MetricInfo {
    pub model_name: String,
    pub model: Regressor,
    pub train_rmse: f64,
    pub train_accuracy: f64,
    pub model_accuracy: f64,
    pub index_number: usize,
}

pub struct ModelFactory {
    config: ModelConfig,
    supplied_models_details: Vec<ModelInitializationDetail>,
}

impl ModelFactory {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            supplied_models_details: Vec::new(),
        }
    }

    pub fn from_file(model_config_path: &Path) -> Result<Self> {
        Ok(Self::new(ModelConfig::from_file(model_config_path)?))
    }

    /// Resolve every configured entry, in serial key order
    pub fn get_supplied_model_details(&mut self) -> Result<&[ModelInitializationDetail]> {
        info!("Getting supplied model details");
        let mut details = Vec::with_capacity(self.config.models.len());

        for (serial, entry) in &self.config.models {
            let kind = ModelKind::from_class(&entry.class)?;
            // Fail on bad fixed params before any fitting starts
            kind.build(&entry.params)?;
            debug!(serial = %serial, model = kind.class_name(), params = %format_params(&entry.params), "Supplied model");

            details.push(ModelInitializationDetail {
                model_serial_number: serial.clone(),
                kind,
                params: entry.params.clone(),
                param_grid: entry.search_param_grid.clone(),
                model_name: kind.class_name().to_string(),
            });
        }

        self.supplied_models_details = details;
        Ok(&self.supplied_models_details)
    }

    pub fn execute_grid_search_operation(
        &self,
        supplied_model: &ModelInitializationDetail,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<GridSearchedBestModel> {
        info!(model = %supplied_model.model_name, "Training started");

        let result = GridSearchCV::new(
            supplied_model.kind,
            supplied_model.params.clone(),
            supplied_model.param_grid.clone(),
        )
        .with_settings(self.config.grid_search.clone())
        .fit(x, y)?;

        info!(
            model = %supplied_model.model_name,
            best_score = result.best_score,
            best_params = %format_params(&result.best_params),
            "Training ended"
        );

        Ok(GridSearchedBestModel {
            model_serial_number: supplied_model.model_serial_number.clone(),
            model_name: supplied_model.model_name.clone(),
            best_model: result.best_estimator,
            best_parameters: result.best_params,
            best_score: result.best_score,
        })
    }

    pub fn initiate_best_parameter_search_for_supplied_models(
        &self,
        supplied_models: &[ModelInitializationDetail],
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<Vec<GridSearchedBestModel>> {
        supplied_models
            .iter()
            .map(|model| self.execute_grid_search_operation(model, x, y))
            .collect()
    }

    pub fn get_best_model_from_grid_searched_best_model_list(
        grid_searched_best_model_list: Vec<GridSearchedBestModel>,
        base_accuracy: f64,
    ) -> Result<ClusterModelDetails> {
        info!("Looking for best model based on score");
        let mut base = base_accuracy;
        let mut best_idx = None;

        for (idx, candidate) in grid_searched_best_model_list.iter().enumerate() {
            info!(model = %candidate.model_name, score = candidate.best_score, "Grid searched model");
            if base < candidate.best_score {
                debug!(model = %candidate.model_name, "Acceptable model found");
                base = candidate.best_score;
                best_idx = Some(idx);
            }
        }

        let idx = best_idx.ok_or(PipelineError::NoAcceptableModel { base_accuracy: base })?;
        Ok(ClusterModelDetails {
            best_model: grid_searched_best_model_list[idx].clone(),
            grid_searched_best_model_list,
        })
    }

    /// Grid-search every supplied model and pick the best one
    pub fn get_best_model(&mut self, x: &Array2<f64>, y: &Array1<f64>, base_accuracy: f64) -> Result<ClusterModelDetails> {
        if self.supplied_models_details.is_empty() {
            self.get_supplied_model_details()?;
        }
        let searched =
            self.initiate_best_parameter_search_for_supplied_models(&self.supplied_models_details, x, y)?;
        Self::get_best_model_from_grid_searched_best_model_list(searched, base_accuracy)
    }
}

/// Rescore fitted models by training fit and k-fold R².
///
/// Returns the last model whose cross-validated R² reaches the running base
/// accuracy, or `None` when no model does.
pub fn evaluate_regression_model(
    models: &[Regressor],
    x: &Array2<f64>,
    y: &Array1<f64>,
    base_accuracy: f64,
    cv_folds: usize,
) -> Result<Option<MetricInfo>> {
    let kfold = KFold::new(cv_folds);
    let mut base = base_accuracy;
    let mut accepted = None;

    for (index_number, model) in models.iter().enumerate() {
        info!(model = model.name(), "Started evaluating model");

        let train = RegressionMetrics::compute(y, &model.predict(x)?)?;
        let model_accuracy = model.cross_val_score(x, y, &kfold)?.mean_score;

        info!(
            model = model.name(),
            train_accuracy = train.r2,
            model_accuracy,
            train_rmse = train.rmse,
            "Model evaluated"
        );

        if model_accuracy >= base {
            base = model_accuracy;
            info!(model = model.name(), model_accuracy, "Acceptable model found");
            accepted = Some(MetricInfo {
                model_name: model.name().to_string(),
                model: model.clone(),
                train_rmse: train.rmse,
                train_accuracy: train.r2,
                model_accuracy,
                index_number,
            });
        }
    }

    if accepted.is_none() {
        info!(base_accuracy, "No model found with higher accuracy than base accuracy");
    }
    Ok(accepted)
}

//! Exhaustive hyperparameter search scored by k-fold cross-validated R²

use crate::config::GridSearchSettings;
use crate::error::{PipelineError, Result};
use crate::training::cross_validation::{CVResults, KFold};
use crate::training::params::{expand_grid, format_params, ParamGrid, ParamSet};
use crate::training::regressor::{ModelKind, Regressor};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Score of one parameter combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    /// `None` when every fold failed to fit
    pub cv: Option<CVResults>,
}

impl CandidateScore {
    pub fn mean_score(&self) -> f64 {
        self.cv.as_ref().map_or(f64::NAN, |cv| cv.mean_score)
    }
}

/// Outcome of a completed search
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Best combination refit on all rows
    pub best_estimator: Regressor,
    pub candidates: Vec<CandidateScore>,
}

pub struct GridSearchCV {
    kind: ModelKind,
    base_params: ParamSet,
    param_grid: ParamGrid,
    settings: GridSearchSettings,
}

impl GridSearchCV {
    pub fn new(kind: ModelKind, base_params: ParamSet, param_grid: ParamGrid) -> Self {
        Self {
            kind,
            base_params,
            param_grid,
            settings: GridSearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GridSearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Every grid combination laid over the base parameters
    pub fn candidate_params(&self) -> Result<Vec<ParamSet>> {
        Ok(expand_grid(&self.param_grid)?
            .into_iter()
            .map(|combo| {
                let mut params = self.base_params.clone();
                params.extend(combo);
                params
            })
            .collect())
    }

    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<GridSearchResult> {
        let kfold = KFold::new(self.settings.cv)
            .with_shuffle(self.settings.shuffle)
            .with_random_state(self.settings.random_state);
        kfold.split(x.nrows())?;

        let params_list = self.candidate_params()?;
        let models: Vec<Regressor> = params_list
            .iter()
            .map(|params| self.kind.build(params))
            .collect::<Result<_>>()?;

        let kfold = if self.settings.shuffle && self.settings.random_state.is_none() {
            // Pin an entropy seed once so all candidates see identical folds
            kfold.with_random_state(Some(rand::random()))
        } else {
            kfold
        };

        debug!(
            model = self.kind.class_name(),
            n_candidates = models.len(),
            n_folds = kfold.n_splits,
            "Grid search started"
        );

        let candidates: Vec<CandidateScore> = models
            .par_iter()
            .zip(params_list.par_iter())
            .map(|(model, params)| {
                let cv = match model.cross_val_score(x, y, &kfold) {
                    Ok(cv) => Some(cv),
                    Err(e) => {
                        warn!(model = model.name(), params = %format_params(params), error = %e, "Candidate failed to fit");
                        None
                    }
                };
                CandidateScore { params: params.clone(), cv }
            })
            .collect();

        // First candidate wins ties; NaN never wins
        let mut best: Option<(usize, f64)> = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            let score = candidate.mean_score();
            if score.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((idx, score));
            }
        }

        let (best_idx, best_score) = best.ok_or_else(|| {
            PipelineError::TrainingError(format!(
                "Every parameter combination of {} failed to fit",
                self.kind.class_name()
            ))
        })?;

        let mut best_estimator = models[best_idx].clone();
        best_estimator.fit(x, y)?;

        Ok(GridSearchResult {
            best_params: candidates[best_idx].params.clone(),
            best_score,
            best_estimator,
            candidates,
        })
    }
}

//! Configurable regressor built from a class name and parameter set

use crate::error::{PipelineError, Result};
use crate::training::cross_validation::{CVResults, KFold};
use crate::training::decision_tree::DecisionTreeRegressor;
use crate::training::knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
use crate::training::linear_models::{LassoRegression, LinearRegression, RidgeRegression};
use crate::training::metrics::r2_score;
use crate::training::params::{ParamSet, ParamValue};
use crate::training::random_forest::{MaxFeatures, RandomForestRegressor};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model classes that may appear in `model.yaml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    LinearRegression,
    Ridge,
    Lasso,
    DecisionTreeRegressor,
    RandomForestRegressor,
    KNeighborsRegressor,
}

impl ModelKind {
    pub fn from_class(class: &str) -> Result<Self> {
        // Accept dotted paths such as `sklearn.linear_model.Ridge`
        let name = class.rsplit('.').next().unwrap_or(class).trim();
        match name {
            "LinearRegression" => Ok(Self::LinearRegression),
            "Ridge" => Ok(Self::Ridge),
            "Lasso" => Ok(Self::Lasso),
            "DecisionTreeRegressor" => Ok(Self::DecisionTreeRegressor),
            "RandomForestRegressor" => Ok(Self::RandomForestRegressor),
            "KNeighborsRegressor" => Ok(Self::KNeighborsRegressor),
            other => Err(PipelineError::ConfigError(format!("Unknown model class: {}", other))),
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            Self::LinearRegression => "LinearRegression",
            Self::Ridge => "Ridge",
            Self::Lasso => "Lasso",
            Self::DecisionTreeRegressor => "DecisionTreeRegressor",
            Self::RandomForestRegressor => "RandomForestRegressor",
            Self::KNeighborsRegressor => "KNeighborsRegressor",
        }
    }

    fn accepted_params(&self) -> &'static [&'static str] {
        match self {
            Self::LinearRegression => &["fit_intercept"],
            Self::Ridge => &["alpha", "fit_intercept"],
            Self::Lasso => &["alpha", "fit_intercept", "max_iter", "tol"],
            Self::DecisionTreeRegressor => &["max_depth", "min_samples_split", "min_samples_leaf"],
            Self::RandomForestRegressor => &[
                "n_estimators",
                "max_depth",
                "min_samples_split",
                "min_samples_leaf",
                "max_features",
                "bootstrap",
                "random_state",
            ],
            Self::KNeighborsRegressor => &["n_neighbors", "weights", "metric"],
        }
    }

    /// Build an unfitted regressor; unknown names and mistyped values are rejected
    pub fn build(&self, params: &ParamSet) -> Result<Regressor> {
        let accepted = self.accepted_params();
        if let Some(unknown) = params.keys().find(|k| !accepted.contains(&k.as_str())) {
            return Err(invalid(unknown, params.get(unknown), &format!("not a parameter of {}", self.class_name())));
        }
        let p = Params(params);

        let regressor = match self {
            Self::LinearRegression => Regressor::Linear(
                LinearRegression::new().with_fit_intercept(p.bool_or("fit_intercept", true)?),
            ),
            Self::Ridge => Regressor::Ridge(
                RidgeRegression::new(p.f64_or("alpha", 1.0)?)
                    .with_fit_intercept(p.bool_or("fit_intercept", true)?),
            ),
            Self::Lasso => Regressor::Lasso(
                LassoRegression::new(p.f64_or("alpha", 1.0)?)
                    .with_fit_intercept(p.bool_or("fit_intercept", true)?)
                    .with_max_iter(p.usize_or("max_iter", 1000)?)
                    .with_tol(p.f64_or("tol", 1e-4)?),
            ),
            Self::DecisionTreeRegressor => Regressor::DecisionTree(
                DecisionTreeRegressor::new()
                    .with_max_depth(p.opt_usize("max_depth")?)
                    .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?),
            ),
            Self::RandomForestRegressor => Regressor::RandomForest(
                RandomForestRegressor::new(p.usize_or("n_estimators", 100)?)
                    .with_max_depth(p.opt_usize("max_depth")?)
                    .with_min_samples_split(p.usize_or("min_samples_split", 2)?)
                    .with_min_samples_leaf(p.usize_or("min_samples_leaf", 1)?)
                    .with_max_features(p.max_features()?)
                    .with_bootstrap(p.bool_or("bootstrap", true)?)
                    .with_random_state(p.opt_usize("random_state")?.map(|s| s as u64)),
            ),
            Self::KNeighborsRegressor => Regressor::KNeighbors(KNNRegressor::new(KNNConfig {
                n_neighbors: p.usize_or("n_neighbors", 5)?,
                weights: p.weights()?,
                metric: p.metric()?,
            })),
        };
        Ok(regressor)
    }
}

fn invalid(name: &str, value: Option<&ParamValue>, reason: &str) -> PipelineError {
    PipelineError::InvalidParameter {
        name: name.to_string(),
        value: value.map(|v| v.to_string()).unwrap_or_default(),
        reason: reason.to_string(),
    }
}

/// Typed lookups over a parameter set
struct Params<'a>(&'a ParamSet);

impl Params<'_> {
    fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| invalid(name, Some(v), "expected a boolean")),
        }
    }

    fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(v) => v.as_float().ok_or_else(|| invalid(name, Some(v), "expected a number")),
        }
    }

    fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        Ok(self.opt_usize(name)?.unwrap_or(default))
    }

    /// Non-negative integer, `null` or absent
    fn opt_usize(&self, name: &str) -> Result<Option<usize>> {
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(v) => match v.as_int() {
                Some(i) if i >= 0 => Ok(Some(i as usize)),
                _ => Err(invalid(name, Some(v), "expected a non-negative integer or null")),
            },
        }
    }

    fn max_features(&self) -> Result<MaxFeatures> {
        let name = "max_features";
        match self.0.get(name) {
            None | Some(ParamValue::Null) => Ok(MaxFeatures::All),
            Some(ParamValue::Int(n)) if *n > 0 => Ok(MaxFeatures::Fixed(*n as usize)),
            Some(ParamValue::Float(f)) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            Some(v @ ParamValue::String(s)) => match s.as_str() {
                "sqrt" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                "all" | "auto" => Ok(MaxFeatures::All),
                _ => Err(invalid(name, Some(v), "expected sqrt, log2, all, an integer or a fraction")),
            },
            Some(v) => Err(invalid(name, Some(v), "expected sqrt, log2, all, an integer or a fraction")),
        }
    }

    fn weights(&self) -> Result<WeightScheme> {
        match self.0.get("weights") {
            None => Ok(WeightScheme::Uniform),
            Some(v) => match v.as_str() {
                Some("uniform") => Ok(WeightScheme::Uniform),
                Some("distance") => Ok(WeightScheme::Distance),
                _ => Err(invalid("weights", Some(v), "expected uniform or distance")),
            },
        }
    }

    fn metric(&self) -> Result<DistanceMetric> {
        match self.0.get("metric") {
            None => Ok(DistanceMetric::Euclidean),
            Some(v) => match v.as_str() {
                Some("euclidean") => Ok(DistanceMetric::Euclidean),
                Some("manhattan") => Ok(DistanceMetric::Manhattan),
                _ => Err(invalid("metric", Some(v), "expected euclidean or manhattan")),
            },
        }
    }
}

/// A regression model of any supported class
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class", content = "model")]
pub enum Regressor {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    KNeighbors(KNNRegressor),
}

impl Regressor {
    pub fn kind(&self) -> ModelKind {
        match self {
            Regressor::Linear(_) => ModelKind::LinearRegression,
            Regressor::Ridge(_) => ModelKind::Ridge,
            Regressor::Lasso(_) => ModelKind::Lasso,
            Regressor::DecisionTree(_) => ModelKind::DecisionTreeRegressor,
            Regressor::RandomForest(_) => ModelKind::RandomForestRegressor,
            Regressor::KNeighbors(_) => ModelKind::KNeighborsRegressor,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().class_name()
    }

    /// Fit in place, replacing any previously learned state
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Regressor::Linear(m) => m.fit(x, y).map(|_| ()),
            Regressor::Ridge(m) => m.fit(x, y).map(|_| ()),
            Regressor::Lasso(m) => m.fit(x, y).map(|_| ()),
            Regressor::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Regressor::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Regressor::KNeighbors(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Regressor::Linear(m) => m.predict(x),
            Regressor::Ridge(m) => m.predict(x),
            Regressor::Lasso(m) => m.predict(x),
            Regressor::DecisionTree(m) => m.predict(x),
            Regressor::RandomForest(m) => m.predict(x),
            Regressor::KNeighbors(m) => m.predict(x),
        }
    }

    /// R² of the predictions on `x`
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        r2_score(y, &self.predict(x)?)
    }

    /// Fit a fresh copy on each training fold and score R² on its test fold
    pub fn cross_val_score(&self, x: &Array2<f64>, y: &Array1<f64>, kfold: &KFold) -> Result<CVResults> {
        if x.nrows() != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut scores = Vec::with_capacity(kfold.n_splits);
        for split in kfold.split(x.nrows())? {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train = y.select(Axis(0), &split.train_indices);
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test = y.select(Axis(0), &split.test_indices);

            let mut fold_model = self.clone();
            fold_model.fit(&x_train, &y_train)?;
            scores.push(fold_model.score(&x_test, &y_test)?);
        }
        Ok(CVResults::from_scores(scores))
    }
}

impl fmt::Display for Regressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

//! Model training module
//!
//! Provides the regressors the pipeline can search over and the machinery
//! around them:
//! - Linear models (OLS, Ridge, Lasso)
//! - Decision trees and Random Forests
//! - K-Nearest Neighbors
//! - KMeans clustering
//! - K-fold cross validation and grid search
//! - Model factory and the per-cluster estimator

pub mod clustering;
pub mod cross_validation;
pub mod decision_tree;
pub mod estimator;
pub mod factory;
pub mod grid_search;
pub mod knn;
pub mod linear_models;
pub mod metrics;
pub mod params;
pub mod random_forest;
pub mod regressor;

pub use clustering::KMeans;
pub use cross_validation::{CVResults, CVSplit, KFold};
pub use decision_tree::{DecisionTreeRegressor, TreeNode};
pub use estimator::ConcreteStrengthEstimator;
pub use factory::{
    evaluate_regression_model, ClusterModelDetails, GridSearchedBestModel, MetricInfo,
    ModelFactory, ModelInitializationDetail,
};
pub use grid_search::{CandidateScore, GridSearchCV, GridSearchResult};
pub use knn::{DistanceMetric, KNNConfig, KNNRegressor, WeightScheme};
pub use linear_models::{LassoRegression, LinearRegression, RidgeRegression};
pub use metrics::{r2_score, root_mean_squared_error, RegressionMetrics};
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use random_forest::{MaxFeatures, RandomForestRegressor};
pub use regressor::{ModelKind, Regressor};

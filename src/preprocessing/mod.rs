//! Feature preprocessing
//!
//! The fitted chain applied to the numeric feature matrix:
//! - Outlier masking (IQR bounds, outliers become NaN)
//! - KNN imputation of missing values
//! - `ln(1 + x)` transform
//! - Standard scaling
//! - KMeans cluster assignment with an elbow-selected cluster count

mod cluster;
mod knn_imputer;
mod outlier;
mod pipeline;
mod scaler;
mod transforms;

pub use cluster::{find_knee, ClusterGenerator};
pub use knn_imputer::KNNImputer;
pub use outlier::OutlierImputer;
pub use pipeline::FeaturePipeline;
pub use scaler::StandardScaler;
pub use transforms::Log1pTransformer;

use crate::error::Result;
use ndarray::Array2;

/// A column-wise step fitted on one matrix and applied to others
pub trait FeatureTransform: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Error unless `x` has the number of columns the step was fitted on
pub(crate) fn check_width(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(crate::error::PipelineError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

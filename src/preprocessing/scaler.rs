//! Standard (z-score) scaling

use super::{check_width, FeatureTransform};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// `(x - mean) / std` per column, with the population standard deviation.
/// Constant columns are only centred.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params()?;
        check_width(mean.len(), x)?;
        Ok(x * &scale.view().insert_axis(Axis(0)) + &mean.view().insert_axis(Axis(0)))
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => Ok((m, s)),
            _ => Err(PipelineError::ModelNotFitted),
        }
    }
}

impl FeatureTransform for StandardScaler {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::PreprocessingError("Cannot scale an empty matrix".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params()?;
        check_width(mean.len(), x)?;
        Ok((x - &mean.view().insert_axis(Axis(0))) / &scale.view().insert_axis(Axis(0)))
    }
}

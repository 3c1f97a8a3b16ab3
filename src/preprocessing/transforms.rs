//! Stateless element-wise transforms

use super::FeatureTransform;
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// `ln(1 + x)` on every entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log1pTransformer;

impl Log1pTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureTransform for Log1pTransformer {
    fn fit(&mut self, _x: &Array2<f64>) -> Result<()> {
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| **v <= -1.0) {
            return Err(PipelineError::PreprocessingError(format!(
                "log1p undefined for {} at row {}, column {}",
                v, row, col
            )));
        }
        Ok(x.mapv(f64::ln_1p))
    }
}

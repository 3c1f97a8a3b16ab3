//! IQR outlier masking

use super::{check_width, is_missing, FeatureTransform};
use crate::error::{PipelineError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Accepted range for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Replaces values outside `[q1 - factor*iqr, q3 + factor*iqr]` with NaN
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierImputer {
    factor: f64,
    bounds: Option<Vec<OutlierBounds>>,
}

impl Default for OutlierImputer {
    fn default() -> Self {
        Self::new(1.5)
    }
}

impl OutlierImputer {
    pub fn new(factor: f64) -> Self {
        Self { factor, bounds: None }
    }

}

/// Quantile with linear interpolation between closest ranks; `sorted` must be non-empty
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl FeatureTransform for OutlierImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if self.factor < 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "outlier_iqr_factor".to_string(),
                value: self.factor.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        let bounds = x
            .columns()
            .into_iter()
            .map(|col| {
                let mut values: Vec<f64> = col.iter().copied().filter(|v| !is_missing(*v)).collect();
                if values.is_empty() {
                    // Nothing observed: leave the column untouched
                    return OutlierBounds {
                        lower: f64::NEG_INFINITY,
                        upper: f64::INFINITY,
                    };
                }
                values.sort_by(|a, b| a.total_cmp(b));
                let q1 = quantile(&values, 0.25);
                let q3 = quantile(&values, 0.75);
                let iqr = q3 - q1;
                OutlierBounds {
                    lower: q1 - self.factor * iqr,
                    upper: q3 + self.factor * iqr,
                }
            })
            .collect();

        self.bounds = Some(bounds);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let bounds = self.bounds.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        check_width(bounds.len(), x)?;

        let mut out = x.clone();
        for (mut col, b) in out.columns_mut().into_iter().zip(bounds) {
            col.mapv_inplace(|v| if is_missing(v) || b.contains(v) { v } else { f64::NAN });
        }
        Ok(out)
    }
}

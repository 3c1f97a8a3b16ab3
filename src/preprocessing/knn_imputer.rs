//! KNN-based imputation

use super::{check_width, is_missing, FeatureTransform};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered float for priority queue
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    // Max heap by distance, later rows first on ties so earlier rows are kept
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// Fills each missing entry with the mean of that feature over the `k`
/// nearest fitted rows that observed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    n_neighbors: usize,
    /// Fitted rows, NaN where unobserved
    #[serde(with = "nan_matrix")]
    donors: Option<Array2<f64>>,
    /// Fallback when no donor shares a coordinate with the row
    feature_means: Option<Array1<f64>>,
}

impl KNNImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            donors: None,
            feature_means: None,
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    fn impute_row(&self, row: ArrayView1<f64>, donors: &Array2<f64>, means: &Array1<f64>) -> Vec<f64> {
        let mut out: Vec<f64> = row.to_vec();
        let missing: Vec<usize> = (0..row.len()).filter(|&j| is_missing(row[j])).collect();
        if missing.is_empty() {
            return out;
        }

        // Distances are shared by every missing feature of this row
        let distances: Vec<f64> = donors.rows().into_iter().map(|d| nan_euclidean(row, d)).collect();

        for j in missing {
            let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(self.n_neighbors + 1);
            for (i, &dist) in distances.iter().enumerate() {
                if !dist.is_finite() || is_missing(donors[[i, j]]) {
                    continue;
                }
                heap.push(DistanceIdx(dist, i));
                if heap.len() > self.n_neighbors {
                    heap.pop();
                }
            }

            out[j] = if heap.is_empty() {
                means[j]
            } else {
                let n = heap.len() as f64;
                heap.into_iter().map(|DistanceIdx(_, i)| donors[[i, j]]).sum::<f64>() / n
            };
        }
        out
    }
}

/// Euclidean distance over coordinates present in both rows, scaled up by
/// the fraction of coordinates used. Infinite when none are shared.
fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let mut present = 0usize;
    let mut sum_sq = 0.0f64;
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        if is_missing(ai) || is_missing(bi) {
            continue;
        }
        present += 1;
        sum_sq += (ai - bi).powi(2);
    }
    if present == 0 {
        return f64::INFINITY;
    }
    (a.len() as f64 / present as f64 * sum_sq).sqrt()
}

/// JSON has no NaN, so missing entries are stored as `null`
mod nan_matrix {
    use ndarray::Array2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    type Encoded = ((usize, usize), Vec<Option<f64>>);

    pub fn serialize<S: Serializer>(x: &Option<Array2<f64>>, s: S) -> std::result::Result<S::Ok, S::Error> {
        let encoded: Option<Encoded> = x
            .as_ref()
            .map(|m| (m.dim(), m.iter().map(|v| if v.is_nan() { None } else { Some(*v) }).collect()));
        encoded.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Array2<f64>>, D::Error> {
        let encoded: Option<Encoded> = Option::deserialize(d)?;
        encoded
            .map(|(shape, data)| {
                let values = data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                Array2::from_shape_vec(shape, values).map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

impl FeatureTransform for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let mut means = Array1::zeros(x.ncols());
        for (j, col) in x.columns().into_iter().enumerate() {
            let observed: Vec<f64> = col.iter().copied().filter(|v| !is_missing(*v)).collect();
            if observed.is_empty() {
                return Err(PipelineError::PreprocessingError(format!(
                    "Feature {} has no observed values to impute from",
                    j
                )));
            }
            means[j] = observed.iter().sum::<f64>() / observed.len() as f64;
        }

        self.donors = Some(x.clone());
        self.feature_means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let donors = self.donors.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        let means = self.feature_means.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        check_width(donors.ncols(), x)?;

        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.impute_row(x.row(i), donors, means))
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((x.nrows(), x.ncols()), flat)?)
    }
}

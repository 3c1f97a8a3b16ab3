//! Cluster assignment with an elbow-selected number of clusters

use crate::error::{PipelineError, Result};
use crate::training::clustering::KMeans;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Picks the cluster count at the knee of the KMeans inertia curve and keeps
/// the final KMeans for assigning new rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterGenerator {
    max_clusters: usize,
    random_state: u64,
    number_of_clusters: usize,
    inertias: Vec<f64>,
    kmeans: Option<KMeans>,
}

impl ClusterGenerator {
    pub fn new(max_clusters: usize, random_state: u64) -> Self {
        Self {
            max_clusters,
            random_state,
            number_of_clusters: 0,
            inertias: Vec::new(),
            kmeans: None,
        }
    }

    pub fn number_of_clusters(&self) -> usize {
        self.number_of_clusters
    }

    /// Inertia for k = 1, 2, ... as measured during fit
    pub fn inertias(&self) -> &[f64] {
        &self.inertias
    }

    pub fn get_no_of_clusters(&mut self, x: &Array2<f64>) -> Result<usize> {
        let k_max = self.max_clusters.min(x.nrows());
        if k_max == 0 {
            return Err(PipelineError::PreprocessingError(
                "Cannot cluster an empty feature matrix".to_string(),
            ));
        }

        let seed = self.random_state;
        let inertias: Vec<f64> = (1..=k_max)
            .into_par_iter()
            .map(|k| {
                let mut km = KMeans::new(k).with_random_state(seed);
                km.fit(x)?;
                km.inertia.ok_or(PipelineError::ModelNotFitted)
            })
            .collect::<Result<_>>()?;

        let ks: Vec<f64> = (1..=k_max).map(|k| k as f64).collect();
        let k = match find_knee(&ks, &inertias) {
            Some(knee) => knee.round() as usize,
            None => fallback_k(&ks, &inertias),
        };
        debug!(?inertias, "KMeans inertia curve");

        self.inertias = inertias;
        self.number_of_clusters = k.max(1);
        Ok(self.number_of_clusters)
    }

    /// Choose k, fit the final KMeans, and return the training labels
    pub fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let k = self.get_no_of_clusters(x)?;
        info!(clusters = k, "Optimal number of clusters");

        let mut kmeans = KMeans::new(k).with_random_state(self.random_state);
        let labels = kmeans.fit_predict(x)?;
        self.kmeans = Some(kmeans);
        Ok(labels)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.kmeans.as_ref().ok_or(PipelineError::ModelNotFitted)?.predict(x)
    }
}

fn normalize(v: &[f64]) -> Option<Vec<f64>> {
    let min = v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return None;
    }
    Some(v.iter().map(|x| (x - min) / range).collect())
}

/// Difference curve of a convex decreasing curve: `(1 - y_norm) - x_norm`
fn difference_curve(x: &[f64], y: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
    let x_norm = normalize(x)?;
    let y_norm = normalize(y)?;
    let diff = y_norm.iter().zip(&x_norm).map(|(yn, xn)| (1.0 - yn) - xn).collect();
    Some((x_norm, diff))
}

/// Indices where `cmp(d[i], neighbour)` holds for both neighbours, with the
/// ends compared against themselves
fn relative_extrema(d: &[f64], cmp: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let n = d.len();
    (0..n)
        .filter(|&i| {
            let prev = d[i.saturating_sub(1)];
            let next = d[(i + 1).min(n - 1)];
            cmp(d[i], prev) && cmp(d[i], next)
        })
        .collect()
}

/// Knee of a convex, decreasing curve (sensitivity 1).
///
/// Walks the difference curve from its first local maximum; the knee is the
/// last maximum seen before the curve drops below that maximum's threshold.
pub fn find_knee(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let (x_norm, diff) = difference_curve(x, y)?;

    let maxima = relative_extrema(&diff, |a, b| a >= b);
    let minima = relative_extrema(&diff, |a, b| a <= b);
    let first_max = *maxima.first()?;

    let step = x_norm.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (x_norm.len() - 1) as f64;

    let mut threshold = f64::NEG_INFINITY;
    let mut threshold_index = first_max;

    for i in first_max..diff.len() - 1 {
        if x_norm[i] >= 1.0 {
            break;
        }
        if maxima.contains(&i) {
            threshold = diff[i] - step;
            threshold_index = i;
        }
        if minima.contains(&i) {
            threshold = 0.0;
        }
        if diff[i + 1] < threshold {
            return Some(x[threshold_index]);
        }
    }
    None
}

/// Fallback when no knee exists: the point farthest above the chord, or the
/// first point on a flat curve.
fn fallback_k(x: &[f64], y: &[f64]) -> usize {
    match difference_curve(x, y) {
        Some((_, diff)) => {
            let idx = diff
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
                .0;
            x[idx].round() as usize
        }
        None => x.first().map_or(1, |v| v.round() as usize),
    }
}

//! K-Means clustering with k-means++ initialisation

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub random_state: Option<u64>,
    /// Fitted cluster centroids (n_clusters × n_features)
    centroids: Option<Array2<f64>>,
    /// Cluster labels assigned during fit
    pub labels: Option<Array1<usize>>,
    /// Sum of squared distances to nearest centroid
    pub inertia: Option<f64>,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            random_state: Some(42),
            centroids: None,
            labels: None,
            inertia: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Centroids spread apart, each drawn with probability proportional to D²
    fn kmeans_pp_init(x: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
        let n_samples = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = rng.gen_range(0..n_samples);
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            let dists: Vec<f64> = x
                .rows()
                .into_iter()
                .map(|row| {
                    (0..c)
                        .map(|j| euclidean_sq(row, centroids.row(j)))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            let total: f64 = dists.iter().sum();
            if total <= 0.0 {
                let idx = rng.gen_range(0..n_samples);
                centroids.row_mut(c).assign(&x.row(idx));
                continue;
            }

            let r = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = n_samples - 1;
            for (i, &d) in dists.iter().enumerate() {
                cumulative += d;
                if cumulative >= r {
                    chosen = i;
                    break;
                }
            }
            centroids.row_mut(c).assign(&x.row(chosen));
        }

        centroids
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if self.n_clusters == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_clusters".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if n_samples < self.n_clusters {
            return Err(PipelineError::TrainingError(format!(
                "n_samples ({}) < n_clusters ({})",
                n_samples, self.n_clusters
            )));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::ComputationError(
                "KMeans input contains non-finite values".to_string(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let mut centroids = Self::kmeans_pp_init(x, self.n_clusters, &mut rng);
        let mut labels = assign(x, &centroids);

        for _iter in 0..self.max_iter {
            let mut new_centroids = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; self.n_clusters];

            for (row, &c) in x.rows().into_iter().zip(labels.iter()) {
                counts[c] += 1;
                let mut target = new_centroids.row_mut(c);
                target += &row;
            }

            for c in 0..self.n_clusters {
                if counts[c] > 0 {
                    new_centroids.row_mut(c).mapv_inplace(|v| v / counts[c] as f64);
                } else {
                    // Empty cluster: reseed from a random sample
                    let idx = rng.gen_range(0..n_samples);
                    new_centroids.row_mut(c).assign(&x.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt();

            centroids = new_centroids;
            let new_labels = assign(x, &centroids);
            let changed = new_labels.iter().zip(labels.iter()).filter(|(a, b)| a != b).count();
            labels = new_labels;

            if changed == 0 || shift < self.tol {
                break;
            }
        }

        let inertia: f64 = x
            .rows()
            .into_iter()
            .zip(labels.iter())
            .map(|(row, &c)| euclidean_sq(row, centroids.row(c)))
            .sum();

        self.centroids = Some(centroids);
        self.labels = Some(labels);
        self.inertia = Some(inertia);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let centroids = self.centroids.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != centroids.ncols() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", centroids.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(assign(x, centroids))
    }

    pub fn fit_predict(&mut self, x: &Array2<f64>) -> Result<Array1<usize>> {
        self.fit(x)?;
        self.labels.clone().ok_or(PipelineError::ModelNotFitted)
    }

    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }
}

fn euclidean_sq(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Nearest centroid per row; lower index wins ties
fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Array1<usize> {
    let labels: Vec<usize> = (0..x.nrows())
        .into_par_iter()
        .map(|i| {
            let row = x.row(i);
            let mut best_c = 0;
            let mut best_dist = f64::MAX;
            for (c, centroid) in centroids.rows().into_iter().enumerate() {
                let d = euclidean_sq(row, centroid);
                if d < best_dist {
                    best_dist = d;
                    best_c = c;
                }
            }
            best_c
        })
        .collect();
    Array1::from_vec(labels)
}

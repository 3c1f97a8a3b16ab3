//! Regression tree with variance-reduction splits

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        gain: f64,
    },
}

/// Regression tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features sampled at each split; all features when `None`
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::TrainingError("Cannot fit a tree on zero samples".to_string()));
        }
        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(PipelineError::InvalidParameter {
                name: "min_samples_split/min_samples_leaf".to_string(),
                value: format!("{}/{}", self.min_samples_split, self.min_samples_leaf),
                reason: "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            });
        }

        self.n_features = n_features;
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let leaf_value = mean_of(y, indices);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_constant(y, indices);

        if should_stop {
            return TreeNode::Leaf { value: leaf_value, n_samples };
        }

        let candidates = self.candidate_features(x.ncols(), rng);
        let Some((feature_idx, threshold, gain)) = self.find_best_split(x, y, indices, &candidates) else {
            return TreeNode::Leaf { value: leaf_value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        importances[feature_idx] += n_samples as f64 * gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            gain,
        }
    }

    fn candidate_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..n_features).collect();
        match self.max_features {
            Some(m) if m > 0 && m < n_features => {
                features.shuffle(rng);
                features.truncate(m);
                features.sort_unstable();
                features
            }
            _ => features,
        }
    }

    /// Best (feature, threshold, variance reduction) among `features`
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len() as f64;
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let parent_impurity = total_sq / n - (total_sum / n).powi(2);
        let min_leaf = self.min_samples_leaf;

        // Each feature scans its sorted values once with running sums
        let feature_results: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature_idx]], y[i])).collect();
                pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let mut best: Option<(f64, f64)> = None;
                let mut left_sum = 0.0f64;
                let mut left_sq = 0.0f64;

                for split in 1..pairs.len() {
                    let (prev_x, prev_y) = pairs[split - 1];
                    left_sum += prev_y;
                    left_sq += prev_y * prev_y;

                    let next_x = pairs[split].0;
                    if next_x <= prev_x {
                        continue;
                    }
                    let left_count = split;
                    let right_count = pairs.len() - split;
                    if left_count < min_leaf || right_count < min_leaf {
                        continue;
                    }

                    let lc = left_count as f64;
                    let rc = right_count as f64;
                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;
                    let left_impurity = left_sq / lc - (left_sum / lc).powi(2);
                    let right_impurity = right_sq / rc - (right_sum / rc).powi(2);
                    let weighted = (lc * left_impurity + rc * right_impurity) / n;
                    let gain = parent_impurity - weighted;

                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (prev_x + next_x) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature wins on equal gain so fits are deterministic
        feature_results.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some((_, _, g)) if cand.2 <= g => acc,
            _ => Some(cand),
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PipelineError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(PipelineError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => break *value,
                        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                            node = if row[*feature_idx] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn mean_of(y: &Array1<f64>, indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

fn is_constant(y: &Array1<f64>, indices: &[usize]) -> bool {
    match indices.first() {
        None => true,
        Some(&first) => indices.iter().all(|&i| (y[i] - y[first]).abs() < 1e-10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_step_function_is_learned() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&array![[2.5], [11.5]]).unwrap();
        assert_eq!(pred[0], 5.0);
        assert_eq!(pred[1], 20.0);
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = Array2::from_shape_fn((20, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(20, |i| (i * i) as f64);

        let mut tree = DecisionTreeRegressor::new().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();
        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_importance_on_informative_feature() {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = Array1::from_shape_fn(30, |i| if i < 15 { 0.0 } else { 10.0 });

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();
        let imp = tree.feature_importances().unwrap();
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_seeded_feature_sampling_is_deterministic() {
        let x = Array2::from_shape_fn((40, 4), |(i, j)| ((i * (j + 3)) % 11) as f64);
        let y = Array1::from_shape_fn(40, |i| (i % 7) as f64);

        let mut a = DecisionTreeRegressor::new().with_max_features(Some(2)).with_random_state(Some(7));
        let mut b = a.clone();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_unfitted() {
        let tree = DecisionTreeRegressor::new();
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}

//! Linear regression family: ordinary least squares, ridge and lasso

use crate::error::{PipelineError, Result};
use crate::training::metrics::r2_score;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve the symmetric positive-definite system `a x = b` by Cholesky factorisation.
/// Returns `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan solve with partial pivoting, used when Cholesky fails
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]]
                .abs()
                .partial_cmp(&aug[[r2, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if aug[[pivot_row, col]].abs() < 1e-10 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                if factor != 0.0 {
                    for j in 0..=n {
                        aug[[row, j]] -= factor * aug[[col, j]];
                    }
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Solve `(X^T X + alpha I) w = X^T y`
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += alpha;
    }
    let xty = x.t().dot(y);

    if let Some(w) = cholesky_solve(&xtx, &xty) {
        return Ok(w);
    }

    // Near-singular Gram matrix: add a tiny ridge before falling back to elimination
    let jitter = 1e-8 * xtx.diag().iter().map(|v| v.abs()).sum::<f64>().max(1.0) / xtx.nrows().max(1) as f64;
    let mut regularized = xtx.clone();
    for i in 0..regularized.nrows() {
        regularized[[i, i]] += jitter;
    }
    cholesky_solve(&regularized, &xty)
        .or_else(|| gauss_jordan_solve(&regularized, &xty))
        .ok_or_else(|| PipelineError::ComputationError("Matrix is singular, cannot solve least squares".to_string()))
}

fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(PipelineError::TrainingError("Cannot fit on zero samples".to_string()));
    }
    Ok(())
}

/// Center `x` and `y` when fitting an intercept
fn center(x: &Array2<f64>, y: &Array1<f64>, fit_intercept: bool) -> Result<(Array2<f64>, Array1<f64>, Array1<f64>, f64)> {
    if !fit_intercept {
        return Ok((x.clone(), y.clone(), Array1::zeros(x.ncols()), 0.0));
    }
    let x_mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PipelineError::ComputationError("Cannot compute feature means".to_string()))?;
    let y_mean = y.mean().unwrap_or(0.0);
    let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
    let y_centered = y - y_mean;
    Ok((x_centered, y_centered, x_mean, y_mean))
}

/// Linear predictor shared by the fitted models
fn linear_predict(
    coefficients: Option<&Array1<f64>>,
    intercept: f64,
    x: &Array2<f64>,
) -> Result<Array1<f64>> {
    let coefficients = coefficients.ok_or(PipelineError::ModelNotFitted)?;
    if x.ncols() != coefficients.len() {
        return Err(PipelineError::ShapeError {
            expected: format!("{} features", coefficients.len()),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(x.dot(coefficients) + intercept)
}

/// Ordinary least squares regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let (xc, yc, x_mean, y_mean) = center(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&xc, &yc, 0.0)?;

        self.intercept = if self.fit_intercept {
            y_mean - coefficients.dot(&x_mean)
        } else {
            0.0
        };
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }

    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        r2_score(y, &self.predict(x)?)
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}

/// Ridge Regression (L2-regularized linear regression)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L2 regularization strength
    pub alpha: f64,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if self.alpha < 0.0 {
            return Err(PipelineError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        let (xc, yc, x_mean, y_mean) = center(x, y, self.fit_intercept)?;
        let coefficients = solve_normal_equations(&xc, &yc, self.alpha)?;

        self.intercept = if self.fit_intercept {
            y_mean - coefficients.dot(&x_mean)
        } else {
            0.0
        };
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

/// Lasso Regression (L1-regularized via coordinate descent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    pub coefficients: Option<Array1<f64>>,
    pub intercept: f64,
    pub fit_intercept: bool,
    /// L1 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
            alpha,
            max_iter: 1000,
            tol: 1e-4,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    fn soft_threshold(val: f64, threshold: f64) -> f64 {
        if val > threshold {
            val - threshold
        } else if val < -threshold {
            val + threshold
        } else {
            0.0
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let (xc, yc, x_mean, y_mean) = center(x, y, self.fit_intercept)?;

        let col_norms: Vec<f64> = (0..n_features)
            .map(|j| xc.column(j).mapv(|v| v * v).sum())
            .collect();

        let mut w = Array1::<f64>::zeros(n_features);
        let lambda = self.alpha * n_samples as f64;
        let mut residual = yc.clone();

        for _iter in 0..self.max_iter {
            let mut max_change = 0.0f64;

            for j in 0..n_features {
                if col_norms[j] < 1e-15 {
                    continue;
                }
                let old = w[j];
                let rho = xc.column(j).dot(&residual) + col_norms[j] * old;
                w[j] = Self::soft_threshold(rho, lambda) / col_norms[j];

                let delta = old - w[j];
                if delta != 0.0 {
                    residual.scaled_add(delta, &xc.column(j));
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.tol {
                break;
            }
        }

        self.intercept = if self.fit_intercept {
            y_mean - w.dot(&x_mean)
        } else {
            0.0
        };
        self.coefficients = Some(w);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        linear_predict(self.coefficients.as_ref(), self.intercept, x)
    }
}

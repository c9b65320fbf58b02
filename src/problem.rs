//! Problem definition.
//!
//! A `Problem` bundles everything the objective needs and never changes
//! during a run: the expanded design `X̂`, the response `y`, the feature graph
//! Laplacian `L` and the hyperparameters.
//!
//! Use the builder to construct one:
//! ```ignore
//! let problem = Problem::from_features(x, y, laplacian, h)
//!     .pho(0.1)
//!     .mu(0.8)
//!     .build()?;
//! ```

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

use crate::error::{Result, SelectError};
use crate::layout::expand_features;
use crate::sparse::{is_symmetric, regularized_laplacian};

/// Diagonal ridge added to the kernel system for invertibility.
pub const RIDGE_EPSILON: f64 = 1e-8;

/// Diagonal shift `r = 1 + 0.1` applied to the Laplacian.
pub const LAPLACIAN_SHIFT: f64 = 1.1;

/// Objective hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// L2 ridge strength, must be positive.
    pub pho: f64,
    /// Graph penalty weight, must be non-negative.
    pub mu: f64,
}

impl Default for Params {
    fn default() -> Self {
        Params { pho: 0.1, mu: 0.8 }
    }
}

impl Params {
    /// Check the parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(self.pho.is_finite() && self.pho > 0.0) {
            return Err(SelectError::InvalidProblem(format!(
                "pho must be positive and finite, got {}",
                self.pho
            )));
        }
        if !(self.mu.is_finite() && self.mu >= 0.0) {
            return Err(SelectError::InvalidProblem(format!(
                "mu must be non-negative and finite, got {}",
                self.mu
            )));
        }
        Ok(())
    }
}

/// An immutable clustered feature-selection problem.
#[derive(Debug, Clone)]
pub struct Problem {
    x_hat: DMatrix<f64>,
    y: DVector<f64>,
    laplacian: CscMatrix<f64>,
    shifted_laplacian: CscMatrix<f64>,
    params: Params,
    d: usize,
    h: usize,
}

impl Problem {
    /// Start from an already expanded `n x (d*h)` design.
    pub fn from_expanded(
        x_hat: DMatrix<f64>,
        y: DVector<f64>,
        laplacian: CscMatrix<f64>,
        d: usize,
        h: usize,
    ) -> ProblemBuilder {
        ProblemBuilder {
            x_hat,
            y,
            laplacian,
            d,
            h,
            params: Params::default(),
        }
    }

    /// Start from the original `n x d` design; columns are repeated `h` times.
    pub fn from_features(
        x: DMatrix<f64>,
        y: DVector<f64>,
        laplacian: CscMatrix<f64>,
        h: usize,
    ) -> ProblemBuilder {
        let d = x.ncols();
        Self::from_expanded(expand_features(&x, h), y, laplacian, d, h)
    }

    /// Accept a response given as an `n x 1` matrix.
    pub fn response_from_column(y: &DMatrix<f64>) -> Result<DVector<f64>> {
        if y.ncols() != 1 {
            return Err(SelectError::shape(
                "response as an n x 1 column",
                format!("{}x{}", y.nrows(), y.ncols()),
            ));
        }
        Ok(y.column(0).into_owned())
    }

    /// Expanded design `X̂` (`n x d*h`).
    pub fn x_hat(&self) -> &DMatrix<f64> {
        &self.x_hat
    }

    /// Response vector.
    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    /// Feature graph Laplacian as given.
    pub fn laplacian(&self) -> &CscMatrix<f64> {
        &self.laplacian
    }

    /// `L + r * I` with `r = LAPLACIAN_SHIFT`.
    pub fn shifted_laplacian(&self) -> &CscMatrix<f64> {
        &self.shifted_laplacian
    }

    /// Hyperparameters.
    pub fn params(&self) -> Params {
        self.params
    }

    /// Number of features.
    pub fn d(&self) -> usize {
        self.d
    }

    /// Number of clusters.
    pub fn h(&self) -> usize {
        self.h
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.x_hat.nrows()
    }

    /// Length of the mask vector.
    pub fn dim(&self) -> usize {
        self.d * self.h
    }

    /// Weight of the exclusivity term: `2 r mu + 2 d + 0.4 pho^2`.
    pub fn eta(&self) -> f64 {
        2.0 * LAPLACIAN_SHIFT * self.params.mu
            + 2.0 * self.d as f64
            + 0.4 * self.params.pho * self.params.pho
    }
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    x_hat: DMatrix<f64>,
    y: DVector<f64>,
    laplacian: CscMatrix<f64>,
    d: usize,
    h: usize,
    params: Params,
}

impl ProblemBuilder {
    /// Set the ridge strength.
    pub fn pho(mut self, pho: f64) -> Self {
        self.params.pho = pho;
        self
    }

    /// Set the graph penalty weight.
    pub fn mu(mut self, mu: f64) -> Self {
        self.params.mu = mu;
        self
    }

    /// Set both hyperparameters.
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Validate the inputs and build the problem.
    pub fn build(self) -> Result<Problem> {
        let ProblemBuilder {
            x_hat,
            y,
            laplacian,
            d,
            h,
            params,
        } = self;
        let (n, dh) = x_hat.shape();

        if d * h != dh {
            return Err(SelectError::dimension(
                format!("d*h = {} columns in X̂", d * h),
                format!("{dh} columns"),
            ));
        }
        if d == 0 || h == 0 || n == 0 {
            return Err(SelectError::InvalidProblem(format!(
                "sizes must be positive, got n={n}, d={d}, h={h}"
            )));
        }
        if y.len() != n {
            return Err(SelectError::shape(
                format!("response of length {n}"),
                format!("length {}", y.len()),
            ));
        }
        if laplacian.nrows() != d || laplacian.ncols() != d {
            return Err(SelectError::shape(
                format!("{d}x{d} Laplacian"),
                format!("{}x{}", laplacian.nrows(), laplacian.ncols()),
            ));
        }
        if !is_symmetric(&laplacian, 1e-10) {
            return Err(SelectError::InvalidProblem(
                "Laplacian must be symmetric".into(),
            ));
        }
        params.validate()?;

        let finite = x_hat.iter().all(|v| v.is_finite())
            && y.iter().all(|v| v.is_finite())
            && laplacian.values().iter().all(|v| v.is_finite());
        if !finite {
            return Err(SelectError::NumericalError(
                "problem data contains non-finite values".into(),
            ));
        }

        let shifted_laplacian = regularized_laplacian(&laplacian, LAPLACIAN_SHIFT);

        Ok(Problem {
            x_hat,
            y,
            laplacian,
            shifted_laplacian,
            params,
            d,
            h,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::csc_identity;

    fn data() -> (DMatrix<f64>, DVector<f64>) {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        (x, y)
    }

    #[test]
    fn test_from_features_expands_design() {
        let (x, y) = data();
        let problem = Problem::from_features(x, y, csc_identity(2), 3)
            .build()
            .unwrap();
        assert_eq!(problem.x_hat().shape(), (3, 6));
        assert_eq!(problem.dim(), 6);
        assert_eq!(problem.n(), 3);
        assert_eq!(problem.params(), Params::default());
    }

    #[test]
    fn test_dimension_checked_first() {
        let (x, _) = data();
        // Wrong response length too, but d*h is reported first
        let y = DVector::zeros(7);
        let err = Problem::from_expanded(x, y, csc_identity(2), 2, 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, SelectError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_response_shape_checked() {
        let (x, _) = data();
        let err = Problem::from_features(x, DVector::zeros(4), csc_identity(2), 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, SelectError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_laplacian_shape_checked() {
        let (x, y) = data();
        let err = Problem::from_features(x, y, csc_identity(3), 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, SelectError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_params_validated() {
        let (x, y) = data();
        let err = Problem::from_features(x.clone(), y.clone(), csc_identity(2), 2)
            .pho(0.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SelectError::InvalidProblem(_)));

        let err = Problem::from_features(x, y, csc_identity(2), 2)
            .mu(-1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, SelectError::InvalidProblem(_)));
    }

    #[test]
    fn test_response_from_column() {
        let y = Problem::response_from_column(&DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]));
        assert_eq!(y.unwrap(), DVector::from_vec(vec![1.0, 2.0, 3.0]));
        let err = Problem::response_from_column(&DMatrix::zeros(3, 2)).unwrap_err();
        assert!(matches!(err, SelectError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_eta() {
        let (x, y) = data();
        let problem = Problem::from_features(x, y, csc_identity(2), 2)
            .build()
            .unwrap();
        // 2 * 1.1 * 0.8 + 2 * 2 + 0.4 * 0.01
        assert!((problem.eta() - 5.764).abs() < 1e-12);
    }
}

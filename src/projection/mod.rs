//! Projection onto the relaxed assignment polytope.
//!
//! The feasible set for a budget `k` is
//!
//! ```text
//! { m in R^{d*h} : m >= 0,  sum_j M[i, j] <= 1 for every feature i,  sum m <= k }
//! ```
//!
//! The row constraint also bounds every entry by one. Projectors return the
//! Euclidean projection of a point onto this set.
//!
//! Two implementations are provided:
//! - [`ClarabelProjector`] solves the projection QP with Clarabel
//! - [`SimplexProjector`] computes it directly by sorting and bisection

pub mod clarabel;
pub mod simplex;

pub use self::clarabel::{ClarabelProjector, Settings, SolveStatus};
pub use simplex::SimplexProjector;

use nalgebra::DVector;

use crate::error::{Result, SelectError};

/// Projection operator onto the budgeted feasible set.
pub trait Projector {
    /// Project `point` (length `d * h`) for cardinality budget `budget`.
    fn project(&self, point: &DVector<f64>, budget: usize, d: usize, h: usize)
        -> Result<DVector<f64>>;
}

impl<P: Projector + ?Sized> Projector for &P {
    fn project(
        &self,
        point: &DVector<f64>,
        budget: usize,
        d: usize,
        h: usize,
    ) -> Result<DVector<f64>> {
        (**self).project(point, budget, d, h)
    }
}

impl<P: Projector + ?Sized> Projector for Box<P> {
    fn project(
        &self,
        point: &DVector<f64>,
        budget: usize,
        d: usize,
        h: usize,
    ) -> Result<DVector<f64>> {
        (**self).project(point, budget, d, h)
    }
}

/// Budget and layout of the feasible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeasibleSet {
    /// Cardinality budget k.
    pub budget: usize,
    /// Number of features.
    pub d: usize,
    /// Number of clusters.
    pub h: usize,
}

impl FeasibleSet {
    /// Create a feasible set, checking `1 <= budget <= d`.
    pub fn new(budget: usize, d: usize, h: usize) -> Result<Self> {
        if d == 0 || h == 0 {
            return Err(SelectError::InvalidProblem(format!(
                "feasible set needs d, h > 0, got d={d}, h={h}"
            )));
        }
        if budget == 0 || budget > d {
            return Err(SelectError::InvalidProblem(format!(
                "budget must be in 1..={d}, got {budget}"
            )));
        }
        Ok(FeasibleSet { budget, d, h })
    }

    /// Length of points in the set.
    pub fn dim(&self) -> usize {
        self.d * self.h
    }

    /// Project `point` with `projector`.
    pub fn project<P: Projector + ?Sized>(
        &self,
        projector: &P,
        point: &DVector<f64>,
    ) -> Result<DVector<f64>> {
        projector.project(point, self.budget, self.d, self.h)
    }

    /// Check membership within `tol`.
    pub fn contains(&self, point: &DVector<f64>, tol: f64) -> bool {
        if point.len() != self.dim() {
            return false;
        }
        if point.iter().any(|&v| v < -tol) {
            return false;
        }
        let rows_ok = point
            .as_slice()
            .chunks(self.h)
            .all(|row| row.iter().sum::<f64>() <= 1.0 + tol);
        rows_ok && point.sum() <= self.budget as f64 + tol
    }
}

/// Validate projector arguments.
pub(crate) fn check_arguments(
    point: &DVector<f64>,
    budget: usize,
    d: usize,
    h: usize,
) -> Result<FeasibleSet> {
    let set = FeasibleSet::new(budget, d, h)?;
    if point.len() != set.dim() {
        return Err(SelectError::dimension(
            format!("point of length d*h = {}", set.dim()),
            point.len(),
        ));
    }
    if point.iter().any(|v| !v.is_finite()) {
        return Err(SelectError::NumericalError(
            "projection point contains non-finite values".into(),
        ));
    }
    Ok(set)
}

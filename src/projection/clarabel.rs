//! Clarabel-backed projection.
//!
//! The projection of `p` is the QP
//!
//! ```text
//! minimize    (1/2) ||m||² - pᵗ m
//! subject to  -m <= 0,  R m <= 1,  1ᵗ m <= k
//! ```
//!
//! where `R` sums each feature row. All constraints go into a single
//! nonnegative cone in Clarabel's `A m + s = b, s >= 0` form.

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra::DVector;
use nalgebra_sparse::CscMatrix;

use super::{check_arguments, FeasibleSet, Projector};
use crate::error::{Result, SelectError};
use crate::sparse::{csc_from_triplets, csc_identity};

/// Solution status from the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Solved to reduced accuracy.
    AlmostOptimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Maximum iterations or time reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved => SolveStatus::Optimal,
            SolverStatus::AlmostSolved => SolveStatus::AlmostOptimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
    /// Accept reduced-accuracy solutions.
    pub accept_almost_solved: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-9,
            tol_gap_rel: 1e-9,
            accept_almost_solved: true,
        }
    }
}

/// Projection through the Clarabel interior-point solver.
#[derive(Debug, Clone, Default)]
pub struct ClarabelProjector {
    settings: Settings,
}

impl ClarabelProjector {
    /// Create a projector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a projector with custom settings.
    pub fn with_settings(settings: Settings) -> Self {
        ClarabelProjector { settings }
    }

    /// Solver settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Projector for ClarabelProjector {
    fn project(
        &self,
        point: &DVector<f64>,
        budget: usize,
        d: usize,
        h: usize,
    ) -> Result<DVector<f64>> {
        let set = check_arguments(point, budget, d, h)?;

        let p = to_clarabel_csc(&csc_identity(set.dim()));
        let q: Vec<f64> = point.iter().map(|v| -v).collect();
        let (a, b) = constraint_system(&set);
        let a = to_clarabel_csc(&a);
        let cones = [SupportedConeT::NonnegativeConeT(b.len())];

        let clarabel_settings = DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit)
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .build()
            .map_err(|e| SelectError::SolverError(format!("invalid settings: {e}")))?;

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, clarabel_settings);
        solver.solve();

        let status: SolveStatus = solver.solution.status.into();
        match status {
            SolveStatus::Optimal => {}
            SolveStatus::AlmostOptimal if self.settings.accept_almost_solved => {
                log::debug!("projection solved to reduced accuracy");
            }
            other => {
                return Err(SelectError::SolverError(format!(
                    "projection failed with status {other:?} after {} iterations",
                    solver.info.iterations
                )))
            }
        }

        // Interior-point iterates sit slightly inside or outside the bounds
        Ok(DVector::from_iterator(
            set.dim(),
            solver.solution.x.iter().map(|v| v.max(0.0)),
        ))
    }
}

/// Build `A` and `b` for `A m <= b`.
fn constraint_system(set: &FeasibleSet) -> (CscMatrix<f64>, Vec<f64>) {
    let (d, h) = (set.d, set.h);
    let dh = set.dim();
    let nrows = dh + d + 1;

    let nnz = 3 * dh;
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut vals = Vec::with_capacity(nnz);

    for col in 0..dh {
        // -m <= 0
        rows.push(col);
        cols.push(col);
        vals.push(-1.0);
        // row sum of feature col / h
        rows.push(dh + col / h);
        cols.push(col);
        vals.push(1.0);
        // budget
        rows.push(dh + d);
        cols.push(col);
        vals.push(1.0);
    }

    let mut b = vec![0.0; nrows];
    b[dh..dh + d].fill(1.0);
    b[dh + d] = set.budget as f64;

    (csc_from_triplets(nrows, dh, rows, cols, vals), b)
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::csc_to_dense;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 200);
    }

    #[test]
    fn test_constraint_system_layout() {
        let set = FeasibleSet::new(1, 2, 3).unwrap();
        let (a, b) = constraint_system(&set);
        let a = csc_to_dense(&a);
        assert_eq!(a.shape(), (9, 6));
        assert_eq!(b, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        // Row sums pick features 0 and 1
        assert_eq!(a.row(6).iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(a.row(7).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(a.row(8).sum(), 6.0);
    }

    #[test]
    fn test_projects_onto_box() {
        let projector = ClarabelProjector::new();
        let point = DVector::from_vec(vec![-0.5, 0.2, 0.1, 0.3]);
        let x = projector.project(&point, 2, 2, 2).unwrap();
        let expected = [0.0, 0.2, 0.1, 0.3];
        for (xi, ei) in x.iter().zip(expected) {
            assert!((xi - ei).abs() < 1e-5, "got {x:?}");
        }
    }
}

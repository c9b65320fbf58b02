//! Clustered L0 relaxation objective.
//!
//! For a mask `m` with assignment matrix `M` (see [`crate::layout`]):
//!
//! ```text
//! Binv       = (1/pho) X̂ Diag(m) X̂ᵗ + (1 + eps) I_n
//! precision  = yᵗ Binv⁻¹ y
//! graph      = 0.5 mu tr(Mᵗ L' M),          L' = L + r I_d
//! correction = 0.5 eta sum_{j != k} (MᵗM)_jk
//! f          = precision + graph + correction
//! ```
//!
//! with gradient
//!
//! ```text
//! ∂precision/∂m = -(1/pho) (X̂ᵗ B y)²        (entrywise square)
//! ∂graph/∂M     = mu L' M
//! ∂correction/∂M = eta (rowsum(M) - M)
//! ```

use nalgebra::{DMatrix, DVector};

use super::{Breakdown, Evaluation, Evaluator};
use crate::error::{Result, SelectError};
use crate::layout::{flatten_assignment, to_assignment};
use crate::problem::{Problem, RIDGE_EPSILON};

/// The clustered L0 objective over a borrowed [`Problem`].
#[derive(Debug, Clone, Copy)]
pub struct L0Objective<'a> {
    problem: &'a Problem,
}

impl<'a> L0Objective<'a> {
    /// Create an objective for `problem`.
    pub fn new(problem: &'a Problem) -> Self {
        L0Objective { problem }
    }

    /// The underlying problem.
    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    /// Evaluate with the per-term decomposition.
    ///
    /// Value, gradient and failure modes are identical to
    /// [`Evaluator::evaluate`].
    pub fn evaluate_breakdown(&self, mask: &DVector<f64>) -> Result<Breakdown> {
        self.compute(mask)
    }

    fn compute(&self, mask: &DVector<f64>) -> Result<Breakdown> {
        let problem = self.problem;
        let (d, h) = (problem.d(), problem.h());

        if mask.len() != problem.dim() {
            return Err(SelectError::dimension(
                format!("mask of length d*h = {}", problem.dim()),
                mask.len(),
            ));
        }
        if let Some(i) = mask.iter().position(|v| !v.is_finite()) {
            return Err(SelectError::NumericalError(format!(
                "mask entry {i} is not finite"
            )));
        }

        let params = problem.params();
        let eta = problem.eta();

        // Precision term
        let by = self.solve_kernel(mask)?;
        let precision = problem.y().dot(&by);
        let precision_grad = (problem.x_hat().transpose() * &by).map(|v| -(v * v) / params.pho);

        // Graph term
        let m = to_assignment(mask, d, h)?;
        let lm: DMatrix<f64> = problem.shifted_laplacian() * &m;
        let graph = 0.5 * params.mu * m.dot(&lm);
        let graph_grad = flatten_assignment(&(lm * params.mu));

        // Exclusivity correction
        let mtm = m.transpose() * &m;
        let correction = 0.5 * eta * (mtm.sum() - mtm.trace());
        let row_sums: Vec<f64> = (0..d).map(|i| m.row(i).sum()).collect();
        let correction_grad =
            flatten_assignment(&DMatrix::from_fn(d, h, |i, j| eta * (row_sums[i] - m[(i, j)])));

        let value = precision + graph + correction;
        if !value.is_finite() {
            return Err(SelectError::NumericalError(format!(
                "objective is not finite (precision={precision}, graph={graph}, correction={correction})"
            )));
        }
        let gradient = &precision_grad + &graph_grad + &correction_grad;

        Ok(Breakdown {
            value,
            gradient,
            graph,
            precision,
            correction,
            precision_grad,
            graph_grad,
            correction_grad,
        })
    }

    /// Solve `Binv z = y`, i.e. `z = B y`.
    ///
    /// The factorization pivots are rank checked with the tolerance
    /// `max_pivot * n * f64::EPSILON` before solving. A rank-deficient kernel
    /// is reported as [`SelectError::Singular`].
    fn solve_kernel(&self, mask: &DVector<f64>) -> Result<DVector<f64>> {
        let problem = self.problem;
        let x_hat = problem.x_hat();
        let n = problem.n();

        // X̂ Diag(m) without forming the diagonal
        let mut scaled = x_hat.clone();
        for (j, &w) in mask.iter().enumerate() {
            scaled.column_mut(j).scale_mut(w);
        }
        let mut kernel = (scaled * x_hat.transpose()) / problem.params().pho;
        for i in 0..n {
            kernel[(i, i)] += 1.0 + RIDGE_EPSILON;
        }

        // SPD for any non-negative mask; LU covers masks the optimizer
        // never produces but callers may pass
        if let Some(chol) = kernel.clone().cholesky() {
            // Elimination pivots of an SPD matrix are the squared diagonal of L
            let pivots = chol.l_dirty().diagonal().map(|l| l * l);
            check_pivots(&pivots)?;
            return Ok(chol.solve(problem.y()));
        }
        let lu = kernel.lu();
        check_pivots(&lu.u().diagonal())?;
        lu.solve(problem.y()).ok_or_else(|| {
            SelectError::NumericalError("kernel system is singular".into())
        })
    }
}

/// Numerical rank from elimination pivots.
fn check_pivots(pivots: &DVector<f64>) -> Result<()> {
    let n = pivots.len();
    let tol = pivots.amax() * n as f64 * f64::EPSILON;
    let rank = pivots.iter().filter(|p| p.abs() > tol).count();
    if rank < n {
        log::debug!("kernel system is rank deficient: rank {rank} of {n}");
        return Err(SelectError::Singular { rank, expected: n });
    }
    Ok(())
}

impl Evaluator for L0Objective<'_> {
    fn dim(&self) -> usize {
        self.problem.dim()
    }

    fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation> {
        self.compute(mask).map(Evaluation::from)
    }
}

impl Problem {
    /// The clustered L0 objective of this problem.
    pub fn objective(&self) -> L0Objective<'_> {
        L0Objective::new(self)
    }
}

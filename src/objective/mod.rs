//! Objective evaluation.
//!
//! The optimizer and the rounding step only see the [`Evaluator`] trait, so any
//! objective with an exact gradient can be plugged in. [`L0Objective`] is the
//! clustered L0 relaxation.

mod l0;

pub use l0::L0Objective;

use nalgebra::DVector;

use crate::error::Result;

/// Loss value and gradient at a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Objective value f.
    pub value: f64,
    /// Gradient of f with respect to the mask.
    pub gradient: DVector<f64>,
}

/// Loss and gradient split by penalty term.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    /// Objective value, `precision + graph + correction`.
    pub value: f64,
    /// Total gradient.
    pub gradient: DVector<f64>,
    /// Graph smoothness penalty `0.5 mu tr(Mᵗ L' M)`.
    pub graph: f64,
    /// Precision (data fit) term `yᵗ B y`.
    pub precision: f64,
    /// Exclusivity correction term.
    pub correction: f64,
    /// Gradient of the precision term.
    pub precision_grad: DVector<f64>,
    /// Gradient of the graph term.
    pub graph_grad: DVector<f64>,
    /// Gradient of the correction term.
    pub correction_grad: DVector<f64>,
}

impl From<Breakdown> for Evaluation {
    fn from(b: Breakdown) -> Self {
        Evaluation {
            value: b.value,
            gradient: b.gradient,
        }
    }
}

/// A differentiable objective over mask vectors.
///
/// Implementations must be pure: repeated calls with the same mask return the
/// same result.
pub trait Evaluator {
    /// Length of the mask vector.
    fn dim(&self) -> usize;

    /// Evaluate the loss and its gradient.
    fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation>;

    /// Evaluate the loss only.
    fn value(&self, mask: &DVector<f64>) -> Result<f64> {
        self.evaluate(mask).map(|e| e.value)
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &E {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation> {
        (**self).evaluate(mask)
    }
}

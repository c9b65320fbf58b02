//! End-to-end clustered feature selection.
//!
//! Starting from the uniform mask `1/(d*h)`, the relaxation is solved with the
//! projected quasi-Newton method, then rounded by sampling and decoded into a
//! feature-to-cluster assignment.
//!
//! ```ignore
//! let selection = FeatureSelector::new(&problem)
//!     .budget(20)
//!     .rounding(RoundingSettings { trials: 500, seed: Some(0) })
//!     .run()?;
//! ```

use nalgebra::DVector;

use crate::error::Result;
use crate::layout::{decode, Assignment};
use crate::objective::{Evaluator, L0Objective};
use crate::optimize::{minimize, PqnResult, PqnSettings};
use crate::problem::Problem;
use crate::projection::{ClarabelProjector, FeasibleSet, Projector};
use crate::rounding::{round, RoundingSettings};

/// Result of a selection run.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Solution of the relaxation.
    pub relaxed: DVector<f64>,
    /// Objective at `relaxed`.
    pub relaxed_value: f64,
    /// Best rounded 0/1 mask.
    pub mask: DVector<f64>,
    /// Objective at `mask`.
    pub value: f64,
    /// Decoded assignment of `mask`.
    pub assignment: Assignment,
    /// Optimizer report.
    pub pqn: PqnResult,
}

/// Builder and driver for a selection run.
pub struct FeatureSelector<'a> {
    problem: &'a Problem,
    budget: usize,
    projector: Box<dyn Projector + 'a>,
    pqn: PqnSettings,
    rounding: RoundingSettings,
}

impl<'a> FeatureSelector<'a> {
    /// Selector with budget `d`, the Clarabel projector and default settings.
    pub fn new(problem: &'a Problem) -> Self {
        FeatureSelector {
            problem,
            budget: problem.d(),
            projector: Box::new(ClarabelProjector::new()),
            pqn: PqnSettings::default(),
            rounding: RoundingSettings::default(),
        }
    }

    /// Set the cardinality budget k.
    pub fn budget(mut self, k: usize) -> Self {
        self.budget = k;
        self
    }

    /// Use a different projection operator.
    pub fn projector(mut self, projector: impl Projector + 'a) -> Self {
        self.projector = Box::new(projector);
        self
    }

    /// Set optimizer settings.
    pub fn pqn(mut self, settings: PqnSettings) -> Self {
        self.pqn = settings;
        self
    }

    /// Set rounding settings.
    pub fn rounding(mut self, settings: RoundingSettings) -> Self {
        self.rounding = settings;
        self
    }

    /// Run relaxation, rounding and decoding.
    pub fn run(&self) -> Result<Selection> {
        let problem = self.problem;
        let set = FeasibleSet::new(self.budget, problem.d(), problem.h())?;
        let objective = L0Objective::new(problem);

        let x0 = DVector::from_element(set.dim(), 1.0 / set.dim() as f64);
        log::info!(
            "selector: n = {}, d = {}, h = {}, k = {}",
            problem.n(),
            problem.d(),
            problem.h(),
            self.budget
        );

        let pqn = minimize(&objective, &self.projector, &set, &x0, &self.pqn)?;
        log::info!(
            "selector: relaxation f = {:.6e} after {} iterations ({:?})",
            pqn.value,
            pqn.iterations,
            pqn.status
        );

        let rounded = round(&objective, &pqn.x, &self.rounding)?;
        let assignment = decode(&rounded.mask, problem.d(), problem.h())?;
        log::info!(
            "selector: rounded f = {:.6e}, {} features selected",
            rounded.value,
            assignment.len()
        );

        Ok(Selection {
            relaxed: pqn.x.clone(),
            relaxed_value: pqn.value,
            mask: rounded.mask,
            value: rounded.value,
            assignment,
            pqn,
        })
    }
}

impl Selection {
    /// Re-evaluate the rounded mask.
    pub fn verify(&self, problem: &Problem) -> Result<f64> {
        problem.objective().value(&self.mask)
    }
}

/// Fraction of the `k` true features that were selected.
pub fn recovery_accuracy(truth: &[usize], predicted: &[usize], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = truth.iter().filter(|t| predicted.contains(t)).count();
    hits as f64 / k as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_accuracy() {
        assert_eq!(recovery_accuracy(&[1, 2, 3, 4], &[2, 4, 9], 4), 0.5);
        assert_eq!(recovery_accuracy(&[1, 2], &[], 2), 0.0);
        assert_eq!(recovery_accuracy(&[], &[1], 0), 0.0);
    }
}

//! Projected quasi-Newton minimization.
//!
//! Each iteration builds an L-BFGS direction `dir = -H g` from the stored
//! correction pairs, projects `x + dir` onto the feasible set and searches
//! along the segment from `x` to that point. The segment stays feasible
//! because the set is convex. When the projected quasi-Newton step is not a
//! descent direction the history is dropped and the projected steepest
//! descent step `P(x - g) - x` is used instead.
//!
//! This is the simplified variant of projected quasi-Newton: the quasi-Newton
//! point is projected directly. The full method instead minimizes the
//! quadratic model `gᵗp + ½ pᵗ H⁻¹ p` over the feasible set with an inner
//! spectral projected gradient solve. The direct projection is not the
//! model minimizer under a non-diagonal `H`, so its step may fail to descend.
//! The steepest descent fallback handles that case.
//!
//! Stopping rules:
//! - projected gradient `||P(x - g) - x||_inf <= opt_tol`
//! - objective or step change below `prog_tol`
//! - `max_iter` iterations

use std::collections::VecDeque;

use nalgebra::DVector;

use crate::error::{Result, SelectError};
use crate::objective::{Evaluation, Evaluator};
use crate::projection::{FeasibleSet, Projector};

/// Curvature pairs with `sᵗy` at or below this are skipped.
const CURVATURE_THRESHOLD: f64 = 1e-10;

/// Optimizer settings.
#[derive(Debug, Clone)]
pub struct PqnSettings {
    /// Maximum iterations.
    pub max_iter: usize,
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Tolerance on the projected gradient (infinity norm).
    pub opt_tol: f64,
    /// Tolerance on objective and step progress.
    pub prog_tol: f64,
    /// Armijo sufficient decrease constant.
    pub suff_dec: f64,
    /// Maximum step halvings per line search.
    pub max_backtracks: usize,
}

impl Default for PqnSettings {
    fn default() -> Self {
        PqnSettings {
            max_iter: 50,
            memory: 10,
            opt_tol: 1e-5,
            prog_tol: 1e-9,
            suff_dec: 1e-4,
            max_backtracks: 30,
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PqnStatus {
    /// Projected gradient below tolerance.
    Converged,
    /// Objective or step change below tolerance, or no descent step found.
    NoProgress,
    /// Iteration limit reached.
    MaxIterations,
}

/// Optimizer output.
#[derive(Debug, Clone)]
pub struct PqnResult {
    /// Final feasible point.
    pub x: DVector<f64>,
    /// Objective at `x`.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Objective evaluations, including the initial one.
    pub evaluations: usize,
    /// Stopping reason.
    pub status: PqnStatus,
}

/// L-BFGS correction history.
struct History {
    s: VecDeque<DVector<f64>>,
    y: VecDeque<DVector<f64>>,
    rho: VecDeque<f64>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        History {
            s: VecDeque::with_capacity(capacity),
            y: VecDeque::with_capacity(capacity),
            rho: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn clear(&mut self) {
        self.s.clear();
        self.y.clear();
        self.rho.clear();
    }

    fn push(&mut self, s: DVector<f64>, y: DVector<f64>) -> bool {
        let sy = s.dot(&y);
        if sy <= CURVATURE_THRESHOLD {
            return false;
        }
        if self.s.len() == self.capacity {
            self.s.pop_front();
            self.y.pop_front();
            self.rho.pop_front();
        }
        self.s.push_back(s);
        self.y.push_back(y);
        self.rho.push_back(1.0 / sy);
        true
    }

    /// Two-loop recursion: returns `-H g`.
    fn direction(&self, grad: &DVector<f64>) -> DVector<f64> {
        let mut q = grad.clone();
        let k = self.s.len();
        let mut alpha = vec![0.0; k];

        for i in (0..k).rev() {
            alpha[i] = self.rho[i] * self.s[i].dot(&q);
            q.axpy(-alpha[i], &self.y[i], 1.0);
        }

        // Initial scaling gamma = sᵗy / yᵗy from the newest pair
        if let (Some(s), Some(y)) = (self.s.back(), self.y.back()) {
            let yy = y.dot(y);
            if yy > 0.0 {
                q *= s.dot(y) / yy;
            }
        }

        for i in 0..k {
            let beta = self.rho[i] * self.y[i].dot(&q);
            q.axpy(alpha[i] - beta, &self.s[i], 1.0);
        }

        -q
    }
}

/// Minimize `evaluator` over `set` starting from `x0`.
///
/// `x0` is projected before the first evaluation.
pub fn minimize<E, P>(
    evaluator: &E,
    projector: &P,
    set: &FeasibleSet,
    x0: &DVector<f64>,
    settings: &PqnSettings,
) -> Result<PqnResult>
where
    E: Evaluator + ?Sized,
    P: Projector + ?Sized,
{
    if evaluator.dim() != set.dim() || x0.len() != set.dim() {
        return Err(SelectError::dimension(
            format!("objective, start point and feasible set of length {}", set.dim()),
            format!("objective {}, start point {}", evaluator.dim(), x0.len()),
        ));
    }
    if settings.memory == 0 {
        return Err(SelectError::InvalidProblem(
            "pqn: history size must be > 0".into(),
        ));
    }

    let mut x = set.project(projector, x0)?;
    let Evaluation {
        value: mut fx,
        gradient: mut grad,
    } = evaluator.evaluate(&x)?;
    let mut evaluations = 1;
    let mut history = History::new(settings.memory);

    log::debug!("pqn: start f = {fx:.6e}, dim = {}", set.dim());

    for iter in 0..settings.max_iter {
        let steepest = &set.project(projector, &(&x - &grad))? - &x;
        let opt_cond = steepest.amax();
        if opt_cond <= settings.opt_tol {
            log::info!("pqn: converged at iteration {iter}, f = {fx:.6e}");
            return Ok(PqnResult {
                x,
                value: fx,
                iterations: iter,
                evaluations,
                status: PqnStatus::Converged,
            });
        }

        let mut step = if history.s.is_empty() {
            steepest.clone()
        } else {
            let candidate = &x + history.direction(&grad);
            &set.project(projector, &candidate)? - &x
        };
        let mut slope = grad.dot(&step);
        if slope > -settings.prog_tol {
            log::debug!("pqn: quasi-Newton step not descent (slope {slope:.3e}), resetting");
            history.clear();
            step = steepest;
            slope = grad.dot(&step);
            if slope > -settings.prog_tol {
                log::info!("pqn: no descent direction at iteration {iter}");
                return Ok(PqnResult {
                    x,
                    value: fx,
                    iterations: iter,
                    evaluations,
                    status: PqnStatus::NoProgress,
                });
            }
        }

        // Armijo backtracking along the feasible segment
        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..=settings.max_backtracks {
            let trial = &x + &step * t;
            let eval = evaluator.evaluate(&trial)?;
            evaluations += 1;
            if eval.value <= fx + settings.suff_dec * t * slope {
                accepted = Some((trial, eval));
                break;
            }
            t *= 0.5;
        }
        let Some((x_new, eval)) = accepted else {
            log::info!("pqn: line search failed at iteration {iter}");
            return Ok(PqnResult {
                x,
                value: fx,
                iterations: iter,
                evaluations,
                status: PqnStatus::NoProgress,
            });
        };

        let s = &x_new - &x;
        let y = &eval.gradient - &grad;
        let f_change = (fx - eval.value).abs();
        let step_change = s.amax();
        history.push(s, y);

        log::debug!(
            "pqn: iter {iter:3} f = {:.6e} t = {t:.3e} opt = {opt_cond:.3e}",
            eval.value
        );

        x = x_new;
        fx = eval.value;
        grad = eval.gradient;

        if f_change < settings.prog_tol || step_change < settings.prog_tol {
            log::info!("pqn: progress below tolerance at iteration {}", iter + 1);
            return Ok(PqnResult {
                x,
                value: fx,
                iterations: iter + 1,
                evaluations,
                status: PqnStatus::NoProgress,
            });
        }
    }

    log::info!("pqn: reached {} iterations, f = {fx:.6e}", settings.max_iter);
    Ok(PqnResult {
        x,
        value: fx,
        iterations: settings.max_iter,
        evaluations,
        status: PqnStatus::MaxIterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::SimplexProjector;
    use nalgebra::DMatrix;

    /// f(m) = 0.5 ||m - c||²
    struct Quadratic {
        center: DVector<f64>,
    }

    impl Evaluator for Quadratic {
        fn dim(&self) -> usize {
            self.center.len()
        }

        fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation> {
            let diff = mask - &self.center;
            Ok(Evaluation {
                value: 0.5 * diff.norm_squared(),
                gradient: diff,
            })
        }
    }

    #[test]
    fn test_two_loop_without_history_is_steepest_descent() {
        let history = History::new(3);
        let g = DVector::from_vec(vec![1.0, -2.0]);
        assert_eq!(history.direction(&g), -g);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = History::new(2);
        for i in 1..=4 {
            let v = DVector::from_element(2, i as f64);
            assert!(history.push(v.clone(), v));
        }
        assert_eq!(history.s.len(), 2);
        assert!(!history.push(DVector::zeros(2), DVector::zeros(2)));
    }

    #[test]
    fn test_interior_minimum() {
        let center = DVector::from_vec(vec![0.2, 0.1, 0.0, 0.3]);
        let objective = Quadratic {
            center: center.clone(),
        };
        let set = FeasibleSet::new(2, 2, 2).unwrap();
        let result = minimize(
            &objective,
            &SimplexProjector::new(),
            &set,
            &DVector::from_element(4, 0.25),
            &PqnSettings::default(),
        )
        .unwrap();
        assert!((&result.x - &center).amax() < 1e-6, "got {}", result.x);
    }

    #[test]
    fn test_minimum_on_boundary() {
        // Unconstrained minimum violates the budget; the answer is its projection
        let center = DVector::from_vec(vec![0.9, 0.0, 0.8, 0.0]);
        let objective = Quadratic {
            center: center.clone(),
        };
        let set = FeasibleSet::new(1, 2, 2).unwrap();
        let projector = SimplexProjector::new();
        let result = minimize(
            &objective,
            &projector,
            &set,
            &DVector::zeros(4),
            &PqnSettings::default(),
        )
        .unwrap();
        let expected = set.project(&projector, &center).unwrap();
        assert!((&result.x - &expected).amax() < 1e-5, "got {}", result.x);
        assert!(set.contains(&result.x, 1e-9));
    }

    /// f(m) = 0.5 (m - c)ᵗ A (m - c) with strongly coupled first two entries
    struct Coupled {
        center: DVector<f64>,
        hessian: DMatrix<f64>,
    }

    impl Evaluator for Coupled {
        fn dim(&self) -> usize {
            self.center.len()
        }

        fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation> {
            let diff = mask - &self.center;
            let gradient = &self.hessian * &diff;
            Ok(Evaluation {
                value: 0.5 * diff.dot(&gradient),
                gradient,
            })
        }
    }

    #[test]
    fn test_coupled_minimum_on_boundary() {
        // Projected quasi-Newton point is not the constrained model minimizer
        let objective = Coupled {
            center: DVector::from_vec(vec![0.9, 0.6, 0.8, 0.0]),
            hessian: DMatrix::from_row_slice(
                4,
                4,
                &[
                    2.0, 1.8, 0.0, 0.0, //
                    1.8, 2.0, 0.0, 0.0, //
                    0.0, 0.0, 1.0, 0.0, //
                    0.0, 0.0, 0.0, 1.0,
                ],
            ),
        };
        let set = FeasibleSet::new(1, 2, 2).unwrap();
        let projector = SimplexProjector::new();
        let x0 = DVector::zeros(4);
        let settings = PqnSettings {
            max_iter: 200,
            ..PqnSettings::default()
        };
        let result = minimize(&objective, &projector, &set, &x0, &settings).unwrap();

        assert!(set.contains(&result.x, 1e-9));
        assert!(result.value < objective.value(&x0).unwrap());
        let grad = objective.evaluate(&result.x).unwrap().gradient;
        let projected = set.project(&projector, &(&result.x - &grad)).unwrap();
        let stationarity = (&projected - &result.x).amax();
        assert!(stationarity < 1e-3, "projected gradient {stationarity}");
    }

    #[test]
    fn test_dimension_mismatch() {
        let objective = Quadratic {
            center: DVector::zeros(3),
        };
        let set = FeasibleSet::new(1, 2, 2).unwrap();
        let err = minimize(
            &objective,
            &SimplexProjector::new(),
            &set,
            &DVector::zeros(4),
            &PqnSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SelectError::DimensionMismatch { .. }));
    }
}

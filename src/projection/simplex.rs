//! Direct projection by sorting and bisection.
//!
//! With a multiplier `lambda >= 0` on the budget, the projection of `p` is
//! `P_C(p - lambda)`, where `C` is the product of the per-row sets
//! `{ x >= 0, sum x <= 1 }`. Each row is projected independently (a capped
//! simplex, solved by sorting), and `lambda` is found by bisection on the
//! total mass, which is non-increasing in `lambda`.

use nalgebra::DVector;

use super::{check_arguments, FeasibleSet, Projector};
use crate::error::Result;

/// Exact projector with no external solver.
#[derive(Debug, Clone, Copy)]
pub struct SimplexProjector {
    /// Maximum bisection steps on the budget multiplier.
    pub max_bisections: usize,
}

impl Default for SimplexProjector {
    fn default() -> Self {
        SimplexProjector { max_bisections: 200 }
    }
}

impl SimplexProjector {
    /// Create a projector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    fn project_shifted(point: &DVector<f64>, set: &FeasibleSet, lambda: f64) -> DVector<f64> {
        let mut out = DVector::zeros(set.dim());
        let mut shifted = vec![0.0; set.h];
        for (row, chunk) in point.as_slice().chunks(set.h).enumerate() {
            for (s, v) in shifted.iter_mut().zip(chunk) {
                *s = v - lambda;
            }
            let start = row * set.h;
            project_row(&shifted, &mut out.as_mut_slice()[start..start + set.h]);
        }
        out
    }
}

impl Projector for SimplexProjector {
    fn project(
        &self,
        point: &DVector<f64>,
        budget: usize,
        d: usize,
        h: usize,
    ) -> Result<DVector<f64>> {
        let set = check_arguments(point, budget, d, h)?;
        let k = budget as f64;

        let unconstrained = Self::project_shifted(point, &set, 0.0);
        if unconstrained.sum() <= k {
            return Ok(unconstrained);
        }

        // Mass is zero once lambda reaches the largest entry
        let mut lo = 0.0;
        let mut hi = point.max();
        for _ in 0..self.max_bisections {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }
            if Self::project_shifted(point, &set, mid).sum() > k {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        // The upper end always satisfies the budget
        Ok(Self::project_shifted(point, &set, hi))
    }
}

/// Project `v` onto `{ x >= 0, sum x <= 1 }`.
fn project_row(v: &[f64], out: &mut [f64]) {
    for (o, &x) in out.iter_mut().zip(v) {
        *o = x.max(0.0);
    }
    if out.iter().sum::<f64>() <= 1.0 {
        return;
    }

    // Otherwise the sum constraint is active: project onto the unit simplex
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let mut cumsum = 0.0;
    let mut theta = 0.0;
    for (j, &u) in sorted.iter().enumerate() {
        cumsum += u;
        let t = (cumsum - 1.0) / (j + 1) as f64;
        if u - t > 0.0 {
            theta = t;
        }
    }
    for (o, &x) in out.iter_mut().zip(v) {
        *o = (x - theta).max(0.0);
    }
}

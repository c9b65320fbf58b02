//! Mask layout.
//!
//! The flat mask of length `d * h` and the `d x h` assignment matrix `M` are
//! related by a row-major reshape:
//!
//! ```text
//! mask[i * h + j] == M[(i, j)]    // feature i, cluster j
//! ```
//!
//! The expanded design `X̂` follows the same order: column `i * h + j` is a
//! copy of column `i` of the original design. Every reshape in the crate goes
//! through this module.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, SelectError};

/// Reshape a flat mask into the `d x h` assignment matrix.
pub fn to_assignment(mask: &DVector<f64>, d: usize, h: usize) -> Result<DMatrix<f64>> {
    if mask.len() != d * h {
        return Err(SelectError::dimension(
            format!("mask of length {} (d={d}, h={h})", d * h),
            mask.len(),
        ));
    }
    Ok(DMatrix::from_row_slice(d, h, mask.as_slice()))
}

/// Flatten an assignment matrix back to a mask (row-major).
pub fn flatten_assignment(assignment: &DMatrix<f64>) -> DVector<f64> {
    let (d, h) = assignment.shape();
    DVector::from_iterator(
        d * h,
        (0..d).flat_map(|i| (0..h).map(move |j| assignment[(i, j)])),
    )
}

/// Repeat every column of `x` `h` times, consecutively.
pub fn expand_features(x: &DMatrix<f64>, h: usize) -> DMatrix<f64> {
    let (n, d) = x.shape();
    DMatrix::from_fn(n, d * h, |r, c| x[(r, c / h)])
}

/// Discrete feature-to-cluster assignment decoded from a mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    /// Selected features, in increasing order.
    pub selected: Vec<usize>,
    /// Cluster index to the features assigned to it.
    pub clusters: BTreeMap<usize, Vec<usize>>,
}

impl Assignment {
    /// Number of selected features.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// True if no feature is selected.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Cluster a feature was assigned to, if selected.
    pub fn cluster_of(&self, feature: usize) -> Option<usize> {
        self.clusters
            .iter()
            .find(|(_, members)| members.contains(&feature))
            .map(|(&c, _)| c)
    }
}

/// Decode a (typically 0/1) mask.
///
/// A feature is selected when its row has a positive sum, and it is placed in
/// the first cluster with a positive entry.
pub fn decode(mask: &DVector<f64>, d: usize, h: usize) -> Result<Assignment> {
    let m = to_assignment(mask, d, h)?;
    let mut assignment = Assignment::default();

    for i in 0..d {
        let row = m.row(i);
        if row.sum() <= 0.0 {
            continue;
        }
        assignment.selected.push(i);
        if let Some(cluster) = row.iter().position(|&v| v > 0.0) {
            assignment.clusters.entry(cluster).or_default().push(i);
        }
    }

    Ok(assignment)
}

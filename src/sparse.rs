//! Sparse matrix utilities.
//!
//! Helpers for assembling graph Laplacians and constraint matrices with
//! nalgebra-sparse.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{Result, SelectError};

/// Create a CSC matrix from triplets (row, col, value).
///
/// Duplicates are summed together. Every index must be in range; callers
/// with untrusted indices use [`try_csc_from_triplets`].
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> CscMatrix<f64> {
    if rows.is_empty() {
        return CscMatrix::zeros(nrows, ncols);
    }

    let mut coo = CooMatrix::new(nrows, ncols);
    for ((row, col), val) in rows.into_iter().zip(cols).zip(vals) {
        debug_assert!(
            row < nrows && col < ncols,
            "triplet ({row}, {col}) outside {nrows}x{ncols}"
        );
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }

    CscMatrix::from(&coo)
}

/// Checked variant of [`csc_from_triplets`].
///
/// Fails on triplet arrays of different lengths or any index outside
/// `nrows x ncols`.
pub fn try_csc_from_triplets(
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
) -> Result<CscMatrix<f64>> {
    if rows.len() != cols.len() || rows.len() != vals.len() {
        return Err(SelectError::dimension(
            format!("{} column indices and values", rows.len()),
            format!("{} column indices, {} values", cols.len(), vals.len()),
        ));
    }
    if let Some((row, col)) = rows
        .iter()
        .zip(&cols)
        .find(|&(&r, &c)| r >= nrows || c >= ncols)
    {
        return Err(SelectError::shape(
            format!("indices within {nrows}x{ncols}"),
            format!("entry ({row}, {col})"),
        ));
    }
    Ok(csc_from_triplets(nrows, ncols, rows, cols, vals))
}

/// Create a CSC identity matrix.
pub fn csc_identity(n: usize) -> CscMatrix<f64> {
    CscMatrix::identity(n)
}

/// Convert a dense matrix to CSC format, dropping exact zeros.
pub fn dense_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut vals = Vec::new();

    for j in 0..dense.ncols() {
        for i in 0..dense.nrows() {
            let v = dense[(i, j)];
            if v != 0.0 {
                rows.push(i);
                cols.push(j);
                vals.push(v);
            }
        }
    }

    csc_from_triplets(dense.nrows(), dense.ncols(), rows, cols, vals)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] += *val;
    }
    dense
}

/// Add two CSC matrices of the same shape.
pub fn csc_add(a: &CscMatrix<f64>, b: &CscMatrix<f64>) -> CscMatrix<f64> {
    let capacity = a.nnz() + b.nnz();
    let mut rows = Vec::with_capacity(capacity);
    let mut cols = Vec::with_capacity(capacity);
    let mut vals = Vec::with_capacity(capacity);

    for (r, c, v) in a.triplet_iter().chain(b.triplet_iter()) {
        rows.push(r);
        cols.push(c);
        vals.push(*v);
    }

    // COO -> CSC conversion sums the duplicates
    csc_from_triplets(a.nrows(), a.ncols(), rows, cols, vals)
}

/// Scale a CSC matrix.
pub fn csc_scale(a: &CscMatrix<f64>, scalar: f64) -> CscMatrix<f64> {
    let values: Vec<f64> = a.values().iter().map(|v| v * scalar).collect();
    let col_offsets: Vec<usize> = a.col_offsets().to_vec();
    let row_indices: Vec<usize> = a.row_indices().to_vec();
    CscMatrix::try_from_csc_data(a.nrows(), a.ncols(), col_offsets, row_indices, values)
        .unwrap_or_else(|_| CscMatrix::zeros(a.nrows(), a.ncols()))
}

/// Check whether a square CSC matrix is symmetric within `tol`.
pub fn is_symmetric(a: &CscMatrix<f64>, tol: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let diff = csc_add(a, &csc_scale(&a.transpose(), -1.0));
    diff.values().iter().all(|v| v.abs() <= tol)
}

/// Shift a Laplacian by `r` on the diagonal: `L + r * I`.
///
/// For `r > 0` and a PSD `L` the result is strictly positive definite.
pub fn regularized_laplacian(laplacian: &CscMatrix<f64>, r: f64) -> CscMatrix<f64> {
    csc_add(laplacian, &csc_scale(&csc_identity(laplacian.nrows()), r))
}

/// Build the combinatorial Laplacian `L = D - A` from a weighted adjacency.
///
/// The adjacency must be square, symmetric and non-negative. Its diagonal
/// (self loops) is ignored.
pub fn laplacian_from_adjacency(adjacency: &CscMatrix<f64>) -> Result<CscMatrix<f64>> {
    let d = adjacency.nrows();
    if adjacency.ncols() != d {
        return Err(SelectError::shape(
            format!("square adjacency ({d}x{d})"),
            format!("{}x{}", d, adjacency.ncols()),
        ));
    }
    if !is_symmetric(adjacency, 1e-12) {
        return Err(SelectError::InvalidProblem(
            "adjacency matrix must be symmetric".into(),
        ));
    }

    let mut degree = vec![0.0; d];
    let mut rows = Vec::with_capacity(adjacency.nnz() + d);
    let mut cols = Vec::with_capacity(adjacency.nnz() + d);
    let mut vals = Vec::with_capacity(adjacency.nnz() + d);

    for (r, c, &w) in adjacency.triplet_iter() {
        if r == c {
            continue;
        }
        if w < 0.0 || !w.is_finite() {
            return Err(SelectError::InvalidProblem(format!(
                "adjacency weight at ({r}, {c}) must be finite and non-negative, got {w}"
            )));
        }
        degree[r] += w;
        rows.push(r);
        cols.push(c);
        vals.push(-w);
    }

    for (i, deg) in degree.into_iter().enumerate() {
        rows.push(i);
        cols.push(i);
        vals.push(deg);
    }

    try_csc_from_triplets(d, d, rows, cols, vals)
}

//! Error types for l0cluster.

use thiserror::Error;

/// Error type for l0cluster operations.
#[derive(Debug, Error)]
pub enum SelectError {
    /// The number of mask entries (d * h) does not match the expanded design.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    /// An input does not have the shape the problem requires.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Invalid problem specification.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The kernel system is not full rank.
    #[error("Kernel matrix is not full rank: rank {rank}, expected {expected}")]
    Singular { rank: usize, expected: usize },

    /// Numerical error.
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Projection solver error.
    #[error("Solver error: {0}")]
    SolverError(String),
}

impl SelectError {
    pub(crate) fn dimension(expected: impl ToString, got: impl ToString) -> Self {
        SelectError::DimensionMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }

    pub(crate) fn shape(expected: impl ToString, got: impl ToString) -> Self {
        SelectError::ShapeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        }
    }
}

/// Result type for l0cluster operations.
pub type Result<T> = std::result::Result<T, SelectError>;

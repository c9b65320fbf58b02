//! # l0cluster
//!
//! Graph-structured clustered L0 feature selection for linear regression.
//!
//! Each of `d` features is assigned to one of `h` clusters, or left out,
//! under a cardinality budget `k`. The Boolean assignment is relaxed to a
//! continuous mask on a bounded polytope, minimized with a projected
//! quasi-Newton method, and rounded back by randomized sampling.
//!
//! ## Quick Start
//!
//! ```ignore
//! use l0cluster::prelude::*;
//!
//! let problem = Problem::from_features(x, y, laplacian, h)
//!     .pho(0.1)
//!     .mu(0.8)
//!     .build()?;
//!
//! // Loss and exact gradient at a mask
//! let eval = problem.objective().evaluate(&mask)?;
//!
//! // Full run
//! let selection = FeatureSelector::new(&problem).budget(k).run()?;
//! println!("selected: {:?}", selection.assignment.selected);
//! ```
//!
//! ## Objective
//!
//! For a mask with assignment matrix `M` (`d x h`, row-major, see [`layout`]):
//!
//! - **Precision**: `yᵗ ((1/pho) X̂ Diag(m) X̂ᵗ + (1 + 1e-8) I)⁻¹ y`
//! - **Graph**: `0.5 mu tr(Mᵗ (L + 1.1 I) M)`
//! - **Correction**: `0.5 eta` times the off-diagonal sum of `MᵗM`
//!
//! ## Architecture
//!
//! - **Problem** value object validated once by a builder
//! - **Evaluator** trait between the objective and everything that calls it
//! - **Projector** trait for the feasible-set projection (Clarabel QP or
//!   direct sorting/bisection)
//! - **PQN** optimizer, **randomized rounding** and a **selector** driver

pub mod error;
pub mod layout;
pub mod objective;
pub mod optimize;
pub mod problem;
pub mod projection;
pub mod rounding;
pub mod selector;
pub mod sparse;
pub mod synthetic;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use l0cluster::prelude::*;
/// ```
pub mod prelude {
    // Problem
    pub use crate::problem::{Params, Problem, ProblemBuilder};

    // Objective
    pub use crate::objective::{Breakdown, Evaluation, Evaluator, L0Objective};

    // Layout
    pub use crate::layout::{decode, expand_features, flatten_assignment, to_assignment, Assignment};

    // Projection
    pub use crate::projection::{ClarabelProjector, FeasibleSet, Projector, SimplexProjector};

    // Optimization
    pub use crate::optimize::{minimize, PqnResult, PqnSettings, PqnStatus};
    pub use crate::rounding::{round, Rounded, RoundingSettings};
    pub use crate::selector::{recovery_accuracy, FeatureSelector, Selection};

    // Data
    pub use crate::sparse::{dense_to_csc, laplacian_from_adjacency};
    pub use crate::synthetic::{generate, SyntheticConfig, SyntheticData};

    // Errors
    pub use crate::error::{Result, SelectError};
}

// Re-export main types at crate root
pub use error::{Result, SelectError};
pub use objective::{Evaluator, L0Objective};
pub use problem::Problem;
pub use selector::{FeatureSelector, Selection};

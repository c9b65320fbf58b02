//! Optimizers over the relaxed assignment polytope.

pub mod pqn;

pub use pqn::{minimize, PqnResult, PqnSettings, PqnStatus};

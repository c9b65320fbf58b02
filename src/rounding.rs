//! Randomized rounding of a relaxed mask.
//!
//! Each trial draws a 0/1 mask with `P(m_i = 1) = relaxed_i` and evaluates the
//! objective there. The draw with the lowest objective is kept; on ties the
//! earliest trial wins.

use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, SelectError};
use crate::objective::Evaluator;

/// Rounding settings.
#[derive(Debug, Clone)]
pub struct RoundingSettings {
    /// Number of random draws.
    pub trials: usize,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for RoundingSettings {
    fn default() -> Self {
        RoundingSettings {
            trials: 500,
            seed: None,
        }
    }
}

/// Best rounded mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Rounded {
    /// The 0/1 mask.
    pub mask: DVector<f64>,
    /// Objective at `mask`.
    pub value: f64,
    /// Index of the trial that produced it.
    pub trial: usize,
}

/// Round `relaxed` by sampling, keeping the draw with the lowest objective.
pub fn round<E: Evaluator + ?Sized>(
    evaluator: &E,
    relaxed: &DVector<f64>,
    settings: &RoundingSettings,
) -> Result<Rounded> {
    if settings.trials == 0 {
        return Err(SelectError::InvalidProblem(
            "rounding needs at least one trial".into(),
        ));
    }
    if relaxed.len() != evaluator.dim() {
        return Err(SelectError::dimension(
            format!("relaxed mask of length {}", evaluator.dim()),
            relaxed.len(),
        ));
    }

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut best: Option<Rounded> = None;
    for trial in 0..settings.trials {
        let mask = relaxed.map(|p| if rng.gen::<f64>() < p { 1.0 } else { 0.0 });
        let value = evaluator.value(&mask)?;
        if best.as_ref().map_or(true, |b| value < b.value) {
            log::debug!("rounding: trial {trial} improves objective to {value:.6e}");
            best = Some(Rounded { mask, value, trial });
        }
    }

    best.ok_or_else(|| SelectError::NumericalError("rounding produced no candidate".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Evaluation;

    /// Counts selected entries; lower is better.
    struct Count;

    impl Evaluator for Count {
        fn dim(&self) -> usize {
            4
        }

        fn evaluate(&self, mask: &DVector<f64>) -> Result<Evaluation> {
            Ok(Evaluation {
                value: mask.sum(),
                gradient: DVector::from_element(4, 1.0),
            })
        }
    }

    #[test]
    fn test_integral_input_is_reproduced() {
        let relaxed = DVector::from_vec(vec![1.0, 0.0, 1.0, 0.0]);
        let rounded = round(&Count, &relaxed, &RoundingSettings::default()).unwrap();
        assert_eq!(rounded.mask, relaxed);
        assert_eq!(rounded.trial, 0);
    }

    #[test]
    fn test_seeded_rounding_is_deterministic() {
        let relaxed = DVector::from_vec(vec![0.5, 0.5, 0.9, 0.1]);
        let settings = RoundingSettings {
            trials: 20,
            seed: Some(7),
        };
        let a = round(&Count, &relaxed, &settings).unwrap();
        let b = round(&Count, &relaxed, &settings).unwrap();
        assert_eq!(a, b);
        assert!(a.mask.iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let settings = RoundingSettings {
            trials: 0,
            seed: Some(1),
        };
        assert!(round(&Count, &DVector::zeros(4), &settings).is_err());
    }
}

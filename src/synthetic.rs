//! Synthetic clustered regression data.
//!
//! `k` of the `d` features carry signal. They are split into `h` clusters of
//! near-equal size and connected within their cluster with probability
//! `theta`, which defines the feature graph. Features outside the support are
//! isolated nodes.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{Result, SelectError};
use crate::sparse::{laplacian_from_adjacency, try_csc_from_triplets};

/// Generator configuration.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Number of samples.
    pub n: usize,
    /// Number of features.
    pub d: usize,
    /// Number of informative features.
    pub k: usize,
    /// Number of clusters.
    pub h: usize,
    /// Within-cluster connection probability.
    pub theta: f64,
    /// Noise standard deviation.
    pub gamma: f64,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            n: 500,
            d: 200,
            k: 20,
            h: 4,
            theta: 1.0,
            gamma: 2.5,
            seed: None,
        }
    }
}

/// A generated dataset with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    /// Design matrix (`n x d`).
    pub x: DMatrix<f64>,
    /// Response.
    pub y: DVector<f64>,
    /// True coefficients, zero off the support.
    pub w_true: DVector<f64>,
    /// Symmetric 0/1 feature adjacency.
    pub adjacency: CscMatrix<f64>,
    /// Graph Laplacian `D - A`.
    pub laplacian: CscMatrix<f64>,
    /// True cluster index to member features.
    pub clusters_true: BTreeMap<usize, Vec<usize>>,
    /// True support, sorted.
    pub selected_true: Vec<usize>,
}

impl SyntheticConfig {
    fn validate(&self) -> Result<()> {
        if self.n == 0 || self.d == 0 || self.h == 0 {
            return Err(SelectError::InvalidProblem(format!(
                "n, d and h must be positive, got n={}, d={}, h={}",
                self.n, self.d, self.h
            )));
        }
        if self.k == 0 || self.k > self.d {
            return Err(SelectError::InvalidProblem(format!(
                "k must be in 1..={}, got {}",
                self.d, self.k
            )));
        }
        if !(0.0..=1.0).contains(&self.theta) {
            return Err(SelectError::InvalidProblem(format!(
                "theta must be a probability, got {}",
                self.theta
            )));
        }
        if !(self.gamma.is_finite() && self.gamma >= 0.0) {
            return Err(SelectError::InvalidProblem(format!(
                "gamma must be non-negative, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

/// Generate a dataset.
pub fn generate(config: &SyntheticConfig) -> Result<SyntheticData> {
    config.validate()?;
    let SyntheticConfig {
        n,
        d,
        k,
        h,
        theta,
        gamma,
        ..
    } = *config;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| SelectError::NumericalError(format!("normal distribution: {e}")))?;

    // Support and its clusters
    let mut features: Vec<usize> = (0..d).collect();
    features.shuffle(&mut rng);
    let support = &features[..k];

    let mut clusters_true: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, &feature) in support.iter().enumerate() {
        clusters_true.entry(idx % h).or_default().push(feature);
    }
    for members in clusters_true.values_mut() {
        members.sort_unstable();
    }
    let mut selected_true = support.to_vec();
    selected_true.sort_unstable();

    // Within-cluster edges
    let (mut rows, mut cols) = (Vec::new(), Vec::new());
    for members in clusters_true.values() {
        for (a, &i) in members.iter().enumerate() {
            for &j in &members[a + 1..] {
                if rng.gen::<f64>() < theta {
                    rows.extend([i, j]);
                    cols.extend([j, i]);
                }
            }
        }
    }
    let vals = vec![1.0; rows.len()];
    let adjacency = try_csc_from_triplets(d, d, rows, cols, vals)?;
    let laplacian = laplacian_from_adjacency(&adjacency)?;

    // Coefficients grow with the cluster index, random sign
    let mut w_true = DVector::zeros(d);
    for (&cluster, members) in &clusters_true {
        for &feature in members {
            let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            w_true[feature] = sign * (1.0 + cluster as f64);
        }
    }

    let x = DMatrix::from_fn(n, d, |_, _| normal.sample(&mut rng));
    let noise = DVector::from_fn(n, |_, _| gamma * normal.sample(&mut rng));
    let y = &x * &w_true + noise;

    Ok(SyntheticData {
        x,
        y,
        w_true,
        adjacency,
        laplacian,
        clusters_true,
        selected_true,
    })
}

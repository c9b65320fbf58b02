//! Projection, optimization and end-to-end selection tests.

use l0cluster::prelude::*;
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Tolerance between the two projectors (Clarabel is an interior-point method)
const PROJ_TOL: f64 = 1e-5;

/// A projection test case.
struct ProjectionCase {
    name: &'static str,
    budget: usize,
    d: usize,
    h: usize,
    scale: f64,
    offset: f64,
}

fn projection_cases() -> Vec<ProjectionCase> {
    vec![
        ProjectionCase {
            name: "loose_budget",
            budget: 6,
            d: 6,
            h: 2,
            scale: 0.3,
            offset: 0.1,
        },
        ProjectionCase {
            name: "tight_budget",
            budget: 1,
            d: 5,
            h: 3,
            scale: 0.5,
            offset: 0.4,
        },
        ProjectionCase {
            name: "rows_active",
            budget: 4,
            d: 4,
            h: 4,
            scale: 0.2,
            offset: 0.6,
        },
        ProjectionCase {
            name: "mostly_negative",
            budget: 2,
            d: 8,
            h: 2,
            scale: 0.4,
            offset: -0.5,
        },
    ]
}

fn random_point(seed: u64, len: usize, scale: f64, offset: f64) -> DVector<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(offset, scale).unwrap();
    DVector::from_fn(len, |_, _| normal.sample(&mut rng))
}

#[test]
fn projectors_agree() {
    let clarabel = ClarabelProjector::new();
    let simplex = SimplexProjector::new();

    for (seed, case) in projection_cases().into_iter().enumerate() {
        let set = FeasibleSet::new(case.budget, case.d, case.h).unwrap();
        let point = random_point(seed as u64, set.dim(), case.scale, case.offset);

        let a = set.project(&clarabel, &point).unwrap();
        let b = set.project(&simplex, &point).unwrap();

        assert!(set.contains(&a, 1e-6), "{}: clarabel result infeasible", case.name);
        assert!(set.contains(&b, 1e-9), "{}: simplex result infeasible", case.name);
        let diff = (&a - &b).amax();
        assert!(diff < PROJ_TOL, "{}: projections differ by {diff}", case.name);
    }
}

#[test]
fn projection_is_idempotent() {
    let simplex = SimplexProjector::new();
    let set = FeasibleSet::new(2, 5, 3).unwrap();
    let point = random_point(42, set.dim(), 0.6, 0.3);
    let once = set.project(&simplex, &point).unwrap();
    let twice = set.project(&simplex, &once).unwrap();
    assert!((&once - &twice).amax() < 1e-12);
}

#[test]
fn projector_rejects_bad_arguments() {
    let simplex = SimplexProjector::new();
    let point = DVector::zeros(6);
    assert!(matches!(
        simplex.project(&point, 2, 2, 2),
        Err(SelectError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        simplex.project(&point, 0, 3, 2),
        Err(SelectError::InvalidProblem(_))
    ));
}

fn small_problem(seed: u64) -> (Problem, SyntheticData) {
    let data = generate(&SyntheticConfig {
        n: 40,
        d: 8,
        k: 4,
        h: 2,
        theta: 1.0,
        gamma: 0.5,
        seed: Some(seed),
    })
    .unwrap();
    let problem = Problem::from_features(data.x.clone(), data.y.clone(), data.laplacian.clone(), 2)
        .pho(0.1)
        .mu(0.8)
        .build()
        .unwrap();
    (problem, data)
}

#[test]
fn pqn_decreases_objective_and_stays_feasible() {
    let (problem, _) = small_problem(3);
    let objective = problem.objective();
    let set = FeasibleSet::new(4, problem.d(), problem.h()).unwrap();
    let projector = SimplexProjector::new();

    let x0 = DVector::from_element(set.dim(), 1.0 / set.dim() as f64);
    let start = objective.value(&set.project(&projector, &x0).unwrap()).unwrap();

    let settings = PqnSettings {
        max_iter: 25,
        ..PqnSettings::default()
    };
    let result = minimize(&objective, &projector, &set, &x0, &settings).unwrap();

    assert!(result.value <= start, "{} > {start}", result.value);
    assert!(set.contains(&result.x, 1e-9));
    assert!(result.iterations <= 25);
    assert!(result.evaluations > result.iterations);
    let recomputed = objective.value(&result.x).unwrap();
    assert!((recomputed - result.value).abs() < 1e-12);
}

#[test]
fn selector_end_to_end() {
    let (problem, data) = small_problem(5);
    let selection = FeatureSelector::new(&problem)
        .budget(4)
        .projector(SimplexProjector::new())
        .pqn(PqnSettings {
            max_iter: 20,
            ..PqnSettings::default()
        })
        .rounding(RoundingSettings {
            trials: 50,
            seed: Some(17),
        })
        .run()
        .unwrap();

    assert!(selection.mask.iter().all(|&v| v == 0.0 || v == 1.0));
    assert_eq!(selection.verify(&problem).unwrap(), selection.value);
    assert_eq!(
        selection.assignment,
        decode(&selection.mask, problem.d(), problem.h()).unwrap()
    );
    let set = FeasibleSet::new(4, problem.d(), problem.h()).unwrap();
    assert!(set.contains(&selection.relaxed, 1e-9));

    let accuracy = recovery_accuracy(&data.selected_true, &selection.assignment.selected, 4);
    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn selector_is_reproducible_with_seed() {
    let (problem, _) = small_problem(8);
    let run = || {
        FeatureSelector::new(&problem)
            .budget(3)
            .projector(SimplexProjector::new())
            .pqn(PqnSettings {
                max_iter: 10,
                ..PqnSettings::default()
            })
            .rounding(RoundingSettings {
                trials: 30,
                seed: Some(99),
            })
            .run()
            .unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.mask, b.mask);
    assert_eq!(a.value, b.value);
}

#[test]
fn selector_rejects_budget_above_feature_count() {
    let (problem, _) = small_problem(1);
    let err = FeatureSelector::new(&problem).budget(9).run().unwrap_err();
    assert!(matches!(err, SelectError::InvalidProblem(_)));
}

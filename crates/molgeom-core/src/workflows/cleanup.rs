use nalgebra::DMatrix;
use tracing::{debug, info, instrument};

use crate::core::utils::geometry::volume;
use crate::engine::config::{CleanupConfig, ErrorWeights};
use crate::engine::error::EngineError;
use crate::engine::error_function::{ErrorFunction, VolumeConstraints};
use crate::engine::minimizer::{self, ConvergenceCriterion, MaxGradient};
use crate::engine::progress::{Progress, ProgressReporter};

/// Coordinates to refine together with the constraints they must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupInput {
    pub coordinates: DMatrix<f64>,
    pub lower: DMatrix<f64>,
    pub upper: DMatrix<f64>,
    pub chirality: VolumeConstraints,
    pub planarity: VolumeConstraints,
}

impl CleanupInput {
    pub fn new(coordinates: DMatrix<f64>, lower: DMatrix<f64>, upper: DMatrix<f64>) -> Self {
        Self {
            coordinates,
            lower,
            upper,
            chirality: VolumeConstraints::new(),
            planarity: VolumeConstraints::new(),
        }
    }

    pub fn with_chirality(mut self, constraints: VolumeConstraints) -> Self {
        self.chirality = constraints;
        self
    }

    pub fn with_planarity(mut self, constraints: VolumeConstraints) -> Self {
        self.planarity = constraints;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupResult {
    pub coordinates: DMatrix<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Whether the starting structure was mirrored before minimization.
    pub flipped: bool,
    pub error: f64,
}

/// Fraction of chirality constraints whose current signed volume has the same
/// sign as the midpoint of its bounds. `None` when there are no constraints.
pub fn chirality_sign_agreement(
    coords: &DMatrix<f64>,
    constraints: &VolumeConstraints,
) -> Option<f64> {
    if constraints.is_empty() {
        return None;
    }
    let agreeing = constraints
        .iter()
        .filter(|(idxs, (lower, upper))| {
            sign(volume(coords, idxs)) == sign(0.5 * (lower + upper))
        })
        .count();
    Some(agreeing as f64 / constraints.len() as f64)
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Refines coordinates against distance bounds and volume constraints, using
/// the maximum-gradient convergence test from `config`.
pub fn run(
    input: CleanupInput,
    config: &CleanupConfig,
    reporter: &ProgressReporter,
) -> Result<CleanupResult, EngineError> {
    let criterion = MaxGradient {
        threshold: config.threshold,
    };
    run_with_criterion(input, config, &criterion, reporter)
}

/// Like [`run`], with a caller-supplied convergence test in place of the
/// configured gradient threshold.
#[instrument(skip_all, name = "cleanup_workflow", fields(atoms = input.coordinates.nrows()))]
pub fn run_with_criterion<C>(
    input: CleanupInput,
    config: &CleanupConfig,
    criterion: &C,
    reporter: &ProgressReporter,
) -> Result<CleanupResult, EngineError>
where
    C: ConvergenceCriterion + ?Sized,
{
    config.validate()?;
    let CleanupInput {
        mut coordinates,
        lower,
        upper,
        chirality,
        planarity,
    } = input;

    let weights = ErrorWeights {
        fourth_dimension: 1.0,
        ..config.weights
    };
    let error_function = ErrorFunction::new(lower, upper, &chirality, &planarity, weights)?;
    error_function.check_coordinates(&coordinates)?;

    let mut flipped = false;
    if config.flip_check {
        if let Some(agreement) = chirality_sign_agreement(&coordinates, &chirality) {
            debug!("Chirality sign agreement: {:.3}", agreement);
            if agreement < 0.5 {
                coordinates.neg_mut();
                flipped = true;
                reporter.report(Progress::Message(
                    "Most chiralities are inverted; mirroring the starting structure.".to_string(),
                ));
                info!(
                    "Inverted starting structure ({:.0}% chiralities correct).",
                    agreement * 100.0
                );
            }
        }
    }

    let max_iterations = config.iteration_cap(coordinates.len());
    info!(
        "Starting cleanup: {} atoms, {} volume constraints, at most {} iterations.",
        error_function.atom_count(),
        error_function.volume_constraints().len(),
        max_iterations
    );

    let result = minimizer::minimize(
        coordinates,
        &error_function,
        criterion,
        max_iterations,
        reporter,
    )?;

    info!(
        "Cleanup finished: converged = {}, iterations = {}, error = {:.6}.",
        result.converged, result.iterations, result.error
    );

    Ok(CleanupResult {
        coordinates: result.coordinates,
        converged: result.converged,
        iterations: result.iterations,
        flipped,
        error: result.error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(n: usize, f: impl Fn(usize, usize) -> (f64, f64)) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut lower = DMatrix::zeros(n, n);
        let mut upper = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    let (l, u) = f(i.min(j), i.max(j));
                    lower[(i, j)] = l;
                    upper[(i, j)] = u;
                }
            }
        }
        (lower, upper)
    }

    fn distance(coords: &DMatrix<f64>, i: usize, j: usize) -> f64 {
        (coords.row(i) - coords.row(j)).norm()
    }

    fn star_input() -> CleanupInput {
        let coords = DMatrix::from_row_slice(
            4,
            3,
            &[
                0.0, 0.0, 0.0, //
                3.0, 0.0, 0.0, //
                0.0, 3.0, 0.0, //
                0.0, 0.0, 3.0, //
            ],
        );
        let (lower, upper) = bounds(4, |i, _| if i == 0 { (1.0, 1.5) } else { (1.0, 2.5) });
        CleanupInput::new(coords, lower, upper)
    }

    fn five_atoms() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            3,
            &[
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                1.0, 1.0, 1.0, //
            ],
        )
    }

    /// Three of the four targets have the opposite sign of the current volumes.
    fn mostly_inverted_chirality() -> VolumeConstraints {
        VolumeConstraints::from([
            ([0, 1, 2, 3], (-2.0, -0.5)),
            ([1, 2, 3, 4], (-3.0, -1.0)),
            ([0, 1, 2, 4], (-2.0, -0.5)),
            ([0, 1, 3, 4], (-2.0, -0.5)),
        ])
    }

    fn flip_input() -> CleanupInput {
        let (lower, upper) = bounds(5, |_, _| (0.5, 3.0));
        CleanupInput::new(five_atoms(), lower, upper).with_chirality(mostly_inverted_chirality())
    }

    #[test]
    fn stretched_bonds_are_pulled_within_upper_bound() {
        let input = star_input();
        let error_function = ErrorFunction::new(
            input.lower.clone(),
            input.upper.clone(),
            &VolumeConstraints::new(),
            &VolumeConstraints::new(),
            ErrorWeights::default(),
        )
        .unwrap();
        assert!(error_function.evaluate(&input.coordinates).unwrap() > 0.0);

        let grad = error_function.gradient(&input.coordinates).unwrap();
        for k in 1..4 {
            let outward = input.coordinates.row(k) - input.coordinates.row(0);
            // Descending the gradient moves the atom back toward the center.
            assert!(grad.row(k).dot(&outward) > 0.0);
        }

        let config = CleanupConfig::builder().threshold(1e-3).build().unwrap();
        let result = run(input, &config, &ProgressReporter::new()).unwrap();
        assert!(result.converged);
        assert!(!result.flipped);
        for k in 1..4 {
            assert!(distance(&result.coordinates, 0, k) <= 1.5 + 1e-6);
        }
    }

    #[test]
    fn satisfied_start_is_returned_unchanged() {
        let coords = five_atoms();
        let (lower, upper) = bounds(5, |_, _| (0.5, 3.0));
        let input = CleanupInput::new(coords.clone(), lower, upper);
        let result = run(input, &CleanupConfig::default(), &ProgressReporter::new()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.error, 0.0);
        assert_eq!(result.coordinates, coords);
    }

    #[test]
    fn sign_agreement_counts_matching_volumes() {
        let coords = five_atoms();
        let chirality = mostly_inverted_chirality();
        assert_eq!(chirality_sign_agreement(&coords, &chirality), Some(0.25));
        assert_eq!(chirality_sign_agreement(&-coords, &chirality), Some(0.75));
        assert_eq!(
            chirality_sign_agreement(&five_atoms(), &VolumeConstraints::new()),
            None
        );
    }

    #[test]
    fn mostly_inverted_start_is_mirrored_before_minimizing() {
        let result = run(flip_input(), &CleanupConfig::default(), &ProgressReporter::new()).unwrap();
        assert!(result.flipped);
        assert!(result.converged);
        assert!(result.error < 1e-12);
        for (idxs, (lower, upper)) in &mostly_inverted_chirality() {
            let vol = volume(&result.coordinates, idxs);
            assert!(*lower - 1e-6 <= vol && vol <= *upper + 1e-6);
        }
    }

    #[test]
    fn flip_check_can_be_disabled() {
        let config = CleanupConfig::builder().flip_check(false).build().unwrap();
        let result = run(flip_input(), &config, &ProgressReporter::new()).unwrap();
        assert!(!result.flipped);
    }

    #[test]
    fn fourth_dimension_is_driven_toward_zero() {
        let mut coords = star_input().coordinates.insert_column(3, 0.0);
        coords[(1, 3)] = 0.8;
        coords[(2, 3)] = -0.6;
        let input = CleanupInput {
            coordinates: coords,
            ..star_input()
        };
        let config = CleanupConfig::builder().threshold(1e-4).build().unwrap();
        let result = run(input, &config, &ProgressReporter::new()).unwrap();
        assert!(result.converged);
        assert!(result.coordinates.column(3).amax() < 1e-3);
    }

    #[test]
    fn custom_criterion_replaces_threshold() {
        let stop_immediately = |_: &DMatrix<f64>, _: f64, _: &DMatrix<f64>| true;
        let input = star_input();
        let start = input.coordinates.clone();
        let result = run_with_criterion(
            input,
            &CleanupConfig::default(),
            &stop_immediately,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(result.converged);
        assert_eq!(result.coordinates, start);
    }

    #[test]
    fn mismatched_coordinates_are_rejected() {
        let (lower, upper) = bounds(3, |_, _| (0.5, 3.0));
        let input = CleanupInput::new(five_atoms(), lower, upper);
        let result = run(input, &CleanupConfig::default(), &ProgressReporter::new());
        assert!(matches!(result, Err(EngineError::ShapeMismatch { .. })));
    }
}

use nalgebra::DMatrix;
use tracing::{debug, trace};

use super::config::DEFAULT_GRADIENT_THRESHOLD;
use super::error::EngineError;
use super::line_search;
use super::progress::{Progress, ProgressReporter};

/// A differentiable scalar function of a coordinate matrix.
pub trait Objective {
    fn value(&self, coords: &DMatrix<f64>) -> f64;
    fn gradient(&self, coords: &DMatrix<f64>) -> DMatrix<f64>;
}

/// Decides whether a point is converged from its coordinates, error and
/// gradient.
pub trait ConvergenceCriterion {
    fn is_converged(
        &self,
        coords: &DMatrix<f64>,
        error: f64,
        gradient: &DMatrix<f64>,
    ) -> Result<bool, EngineError>;
}

impl<F> ConvergenceCriterion for F
where
    F: Fn(&DMatrix<f64>, f64, &DMatrix<f64>) -> bool,
{
    fn is_converged(
        &self,
        coords: &DMatrix<f64>,
        error: f64,
        gradient: &DMatrix<f64>,
    ) -> Result<bool, EngineError> {
        Ok(self(coords, error, gradient))
    }
}

/// Converged once every gradient component is smaller than `threshold` in
/// magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxGradient {
    pub threshold: f64,
}

impl Default for MaxGradient {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GRADIENT_THRESHOLD,
        }
    }
}

impl ConvergenceCriterion for MaxGradient {
    fn is_converged(
        &self,
        coords: &DMatrix<f64>,
        _error: f64,
        gradient: &DMatrix<f64>,
    ) -> Result<bool, EngineError> {
        if coords.shape() != gradient.shape() {
            return Err(EngineError::ShapeMismatch {
                what: "gradient",
                expected: coords.shape(),
                found: gradient.shape(),
            });
        }
        Ok(gradient.amax() < self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizationResult {
    pub coordinates: DMatrix<f64>,
    pub converged: bool,
    /// Number of steps taken.
    pub iterations: usize,
    /// Objective value at the returned coordinates.
    pub error: f64,
}

/// The default iteration cap: three times the number of coordinates.
pub fn default_max_iterations(coords: &DMatrix<f64>) -> usize {
    3 * coords.len()
}

/// Polak-Ribiere coefficient from the current and previous steepest-descent
/// directions.
pub fn polak_ribiere_beta(sd: &DMatrix<f64>, sd_prev: &DMatrix<f64>) -> f64 {
    let denom = sd_prev.dot(sd_prev);
    if denom == 0.0 {
        return 0.0;
    }
    sd.dot(&(sd - sd_prev)) / denom
}

/// Minimizes `objective` by nonlinear conjugate gradients.
///
/// Each iteration takes the steepest-descent direction, mixes in the previous
/// search direction with the Polak-Ribiere coefficient clamped to `min(0, beta)`,
/// checks convergence at the current point, and otherwise steps to the minimum
/// along the search direction found by [`line_search::minimize_scalar`].
///
/// Reaching `max_iterations` without convergence is not an error; the result
/// carries `converged = false`.
///
/// # Errors
///
/// Returns [`EngineError::LineSearch`] if a line search fails and
/// [`EngineError::ShapeMismatch`] if the gradient does not match the
/// coordinates.
pub fn minimize<O, C>(
    coords: DMatrix<f64>,
    objective: &O,
    criterion: &C,
    max_iterations: usize,
    reporter: &ProgressReporter,
) -> Result<MinimizationResult, EngineError>
where
    O: Objective + ?Sized,
    C: ConvergenceCriterion + ?Sized,
{
    let mut x = coords;
    let mut previous: Option<(DMatrix<f64>, DMatrix<f64>)> = None;
    let mut converged = false;
    let mut steps = 0;

    debug!("Initial error: {:.6}", objective.value(&x));

    for index in 0..max_iterations {
        let gradient = objective.gradient(&x);
        if gradient.shape() != x.shape() {
            return Err(EngineError::ShapeMismatch {
                what: "gradient",
                expected: x.shape(),
                found: gradient.shape(),
            });
        }
        let sd = -&gradient;

        let cd = match previous.take() {
            None => sd.clone(),
            Some((sd_prev, cd_prev)) => {
                let beta = polak_ribiere_beta(&sd, &sd_prev).min(0.0);
                &sd + cd_prev * beta
            }
        };

        let error = objective.value(&x);
        let max_gradient = sd.amax();
        trace!(index, error, max_gradient, "Conjugate-gradient iteration");
        reporter.report(Progress::Iteration {
            index,
            error,
            max_gradient,
        });

        if criterion.is_converged(&x, error, &gradient)? {
            converged = true;
            break;
        }

        let outcome = line_search::minimize_scalar(|alpha| objective.value(&(&x + &cd * alpha)))?;
        x += &cd * outcome.alpha;
        steps += 1;

        previous = Some((sd, cd));
    }

    let error = objective.value(&x);
    debug!(
        "Minimization finished after {} steps (converged: {}, error: {:.6})",
        steps, converged, error
    );
    reporter.report(Progress::Finished {
        iterations: steps,
        converged,
    });

    Ok(MinimizationResult {
        coordinates: x,
        converged,
        iterations: steps,
        error,
    })
}

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use super::config::ErrorWeights;
use super::error::EngineError;
use super::minimizer::Objective;
use crate::core::utils::geometry::{central_difference, distance_matrix, volume, volume_gradient};

/// Ordered atom tetrads mapped to (lower, upper) bounds on their signed volume.
pub type VolumeConstraints = BTreeMap<[usize; 4], (f64, f64)>;

/// Step used for the finite-difference gradient check.
const NUMERICAL_STEP: f64 = 1e-3;
pub const DEFAULT_STENCIL_POINTS: usize = 11;

/// The distance-geometry embedding error and its analytic gradient.
///
/// The error sums three non-negative terms over a coordinate matrix `X`
/// (N x 3, or N x 4 with an auxiliary fourth dimension):
///
/// - a distance term over atom pairs `i < j`, penalizing
///   `(l^2 - d^2) / (eps_l^2 + d^2)` and `(d^2 - u^2) / (eps_u^2 + u^2)`
///   where they are positive, squared;
/// - a volume term over chirality and planarity tetrads, penalizing the
///   squared excursion of each signed volume outside its bounds;
/// - a fourth-dimension term, the sum of squares of column 3 when present.
///
/// Every term is scaled by its [`ErrorWeights`] weight.
#[derive(Debug, Clone)]
pub struct ErrorFunction {
    lower: DMatrix<f64>,
    upper: DMatrix<f64>,
    volume_constraints: VolumeConstraints,
    weights: ErrorWeights,
}

impl ErrorFunction {
    /// Builds the error function from distance bounds and volume constraints.
    ///
    /// Chirality and planarity constraints are merged; a planarity entry
    /// replaces a chirality entry with the same tetrad.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ShapeMismatch`] if the bound matrices are not
    /// square and equally sized, and [`EngineError::ConstraintIndex`] if a
    /// tetrad references an atom outside them.
    pub fn new(
        lower: DMatrix<f64>,
        upper: DMatrix<f64>,
        chirality: &VolumeConstraints,
        planarity: &VolumeConstraints,
        weights: ErrorWeights,
    ) -> Result<Self, EngineError> {
        let n = lower.nrows();
        if lower.ncols() != n {
            return Err(EngineError::ShapeMismatch {
                what: "lower bound matrix",
                expected: (n, n),
                found: lower.shape(),
            });
        }
        if upper.shape() != (n, n) {
            return Err(EngineError::ShapeMismatch {
                what: "upper bound matrix",
                expected: (n, n),
                found: upper.shape(),
            });
        }

        let volume_constraints: VolumeConstraints = chirality
            .iter()
            .chain(planarity.iter())
            .map(|(&idxs, &bounds)| (idxs, bounds))
            .collect();
        if let Some(&idxs) = volume_constraints
            .keys()
            .find(|idxs| idxs.iter().any(|&i| i >= n))
        {
            return Err(EngineError::ConstraintIndex { idxs, atoms: n });
        }

        Ok(Self {
            lower,
            upper,
            volume_constraints,
            weights,
        })
    }

    pub fn atom_count(&self) -> usize {
        self.lower.nrows()
    }

    pub fn weights(&self) -> &ErrorWeights {
        &self.weights
    }

    pub fn volume_constraints(&self) -> &VolumeConstraints {
        &self.volume_constraints
    }

    /// Verifies that `coords` has one row per atom and three or four columns.
    pub fn check_coordinates(&self, coords: &DMatrix<f64>) -> Result<(), EngineError> {
        let n = self.atom_count();
        if coords.nrows() != n || !(3..=4).contains(&coords.ncols()) {
            let cols = if coords.ncols() == 4 { 4 } else { 3 };
            return Err(EngineError::ShapeMismatch {
                what: "coordinate matrix",
                expected: (n, cols),
                found: coords.shape(),
            });
        }
        Ok(())
    }

    pub fn evaluate(&self, coords: &DMatrix<f64>) -> Result<f64, EngineError> {
        self.check_coordinates(coords)?;
        Ok(self.error(coords))
    }

    pub fn gradient(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>, EngineError> {
        self.check_coordinates(coords)?;
        Ok(self.error_gradient(coords))
    }

    /// Central-difference gradient of the error, for checking [`Self::gradient`].
    pub fn numerical_gradient(
        &self,
        coords: &DMatrix<f64>,
        points: usize,
    ) -> Result<DMatrix<f64>, EngineError> {
        self.check_coordinates(coords)?;
        central_difference(|x| self.error(x), coords, NUMERICAL_STEP, points)
            .ok_or(EngineError::UnsupportedStencil { points })
    }

    fn distance_terms(&self, i: usize, j: usize, dist: f64) -> (f64, f64) {
        let ErrorWeights {
            lower_epsilon: leps,
            upper_epsilon: ueps,
            ..
        } = self.weights;
        let (l, u) = (self.lower[(i, j)], self.upper[(i, j)]);
        let d2 = dist * dist;
        let lt = ((l * l - d2) / (leps * leps + d2)).max(0.0);
        let ut = ((d2 - u * u) / (ueps * ueps + u * u)).max(0.0);
        (lt, ut)
    }

    /// Signed excursion of a volume outside its bounds, zero inside them.
    fn volume_excursion(vol: f64, (lower, upper): (f64, f64)) -> f64 {
        if vol < lower {
            vol - lower
        } else if vol > upper {
            vol - upper
        } else {
            0.0
        }
    }

    fn error(&self, coords: &DMatrix<f64>) -> f64 {
        let n = self.atom_count();
        let dmat = distance_matrix(coords);

        let mut dist_err = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let (lt, ut) = self.distance_terms(i, j, dmat[(i, j)]);
                dist_err += lt * lt + ut * ut;
            }
        }

        let chip_err: f64 = self
            .volume_constraints
            .iter()
            .map(|(idxs, &bounds)| Self::volume_excursion(volume(coords, idxs), bounds).powi(2))
            .sum();

        let dim4_err = if coords.ncols() == 4 {
            coords.column(3).norm_squared()
        } else {
            0.0
        };

        self.weights.distance * dist_err
            + self.weights.chirality * chip_err
            + self.weights.fourth_dimension * dim4_err
    }

    fn error_gradient(&self, coords: &DMatrix<f64>) -> DMatrix<f64> {
        let n = self.atom_count();
        let ErrorWeights {
            distance: wdist,
            chirality: wchip,
            fourth_dimension: wdim4,
            lower_epsilon: leps,
            upper_epsilon: ueps,
        } = self.weights;
        let dmat = distance_matrix(coords);
        let mut grad = DMatrix::zeros(coords.nrows(), coords.ncols());

        for i in 0..n {
            for j in (i + 1)..n {
                let dist = dmat[(i, j)];
                let (lt, ut) = self.distance_terms(i, j, dist);
                if lt == 0.0 && ut == 0.0 {
                    continue;
                }
                let (l, u) = (self.lower[(i, j)], self.upper[(i, j)]);
                let d2 = dist * dist;
                let ltg = -4.0 * lt * (leps * leps + l * l) / (leps * leps + d2).powi(2);
                let utg = 4.0 * ut / (ueps * ueps + u * u);
                let diff = (coords.row(i) - coords.row(j)) * (wdist * (ltg + utg));
                {
                    let mut row = grad.row_mut(i);
                    row += &diff;
                }
                let mut row = grad.row_mut(j);
                row -= &diff;
            }
        }

        for (idxs, &bounds) in &self.volume_constraints {
            let excursion = Self::volume_excursion(volume(coords, idxs), bounds);
            if excursion != 0.0 {
                grad += volume_gradient(coords, idxs) * (2.0 * wchip * excursion);
            }
        }

        if coords.ncols() == 4 {
            let mut col = grad.column_mut(3);
            col += coords.column(3) * (2.0 * wdim4);
        }

        grad
    }
}

impl Objective for ErrorFunction {
    fn value(&self, coords: &DMatrix<f64>) -> f64 {
        self.error(coords)
    }

    fn gradient(&self, coords: &DMatrix<f64>) -> DMatrix<f64> {
        self.error_gradient(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRADIENT_TOLERANCE: f64 = 1e-4;

    fn f64_approx_equal(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn uniform_bounds(n: usize, lower: f64, upper: f64) -> (DMatrix<f64>, DMatrix<f64>) {
        let mut lmat = DMatrix::from_element(n, n, lower);
        let mut umat = DMatrix::from_element(n, n, upper);
        lmat.fill_diagonal(0.0);
        umat.fill_diagonal(0.0);
        (lmat, umat)
    }

    fn tetrahedron() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            3,
            &[
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
            ],
        )
    }

    fn distorted_4d() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            4,
            &[
                0.0, 0.1, -0.2, 0.3, //
                2.4, 0.0, 0.1, -0.4, //
                0.3, 0.4, 0.2, 0.2, //
                -0.1, 1.9, 1.1, 0.0, //
                1.0, -1.2, 2.6, 0.5, //
            ],
        )
    }

    fn chirality() -> VolumeConstraints {
        VolumeConstraints::from([([0, 1, 2, 3], (0.5, 2.0)), ([1, 2, 3, 4], (-3.0, -1.0))])
    }

    fn error_function(n: usize, lower: f64, upper: f64, chi: VolumeConstraints) -> ErrorFunction {
        let (lmat, umat) = uniform_bounds(n, lower, upper);
        ErrorFunction::new(lmat, umat, &chi, &VolumeConstraints::new(), ErrorWeights::default())
            .unwrap()
    }

    #[test]
    fn error_is_zero_when_every_bound_is_satisfied() {
        let chi = VolumeConstraints::from([([0, 1, 2, 3], (0.5, 1.5))]);
        let erf = error_function(4, 0.9, 1.5, chi);
        assert_eq!(erf.evaluate(&tetrahedron()).unwrap(), 0.0);
        assert!(erf.gradient(&tetrahedron()).unwrap().iter().all(|&g| g == 0.0));
    }

    #[test]
    fn error_is_positive_for_each_kind_of_violation() {
        let coords = tetrahedron();

        let too_far = error_function(4, 0.0, 1.0, VolumeConstraints::new());
        assert!(too_far.evaluate(&coords).unwrap() > 0.0);

        let too_close = error_function(4, 1.2, 5.0, VolumeConstraints::new());
        assert!(too_close.evaluate(&coords).unwrap() > 0.0);

        let inverted = VolumeConstraints::from([([0, 1, 2, 3], (-1.5, -0.5))]);
        let wrong_hand = error_function(4, 0.9, 1.5, inverted);
        assert!(f64_approx_equal(
            wrong_hand.evaluate(&coords).unwrap(),
            1.5_f64.powi(2),
            1e-12
        ));

        let mut lifted = coords.clone().insert_column(3, 0.0);
        lifted[(2, 3)] = 0.5;
        let fourth = error_function(4, 0.0, 10.0, VolumeConstraints::new());
        assert!(f64_approx_equal(fourth.evaluate(&lifted).unwrap(), 0.25, 1e-12));
    }

    #[test]
    fn upper_bound_term_matches_closed_form() {
        let coords = DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.0, 3.0, 0.0, 0.0]);
        let erf = error_function(2, 1.0, 1.5, VolumeConstraints::new());
        let ut = (9.0 - 2.25) / (0.01 + 2.25);
        assert!(f64_approx_equal(erf.evaluate(&coords).unwrap(), ut * ut, 1e-12));
    }

    #[test]
    fn error_is_non_negative_across_varied_coordinates() {
        let erf = error_function(5, 1.0, 2.0, chirality());
        let base = distorted_4d();
        for k in 0..10 {
            let scale = 0.2 + 0.3 * k as f64;
            let coords = base.map(|x| (x * scale).sin() * 2.0);
            assert!(erf.evaluate(&coords).unwrap() >= 0.0);
        }
    }

    #[test]
    fn analytic_gradient_matches_numerical_gradient() {
        let erf = error_function(5, 1.0, 2.0, chirality());
        let base = distorted_4d();
        let samples = [
            base.clone(),
            base.map(|x| x * 0.4),
            base.map(|x| x * 1.7 - 0.3),
            base.columns(0, 3).into_owned(),
        ];
        for coords in &samples {
            let analytic = erf.gradient(coords).unwrap();
            let numeric = erf
                .numerical_gradient(coords, DEFAULT_STENCIL_POINTS)
                .unwrap();
            let diff = (&analytic - &numeric).amax();
            assert!(diff < GRADIENT_TOLERANCE, "gradient mismatch {diff}");
        }
    }

    #[test]
    fn planarity_overrides_chirality_on_identical_tetrads() {
        let (lmat, umat) = uniform_bounds(4, 0.0, 10.0);
        let chi = VolumeConstraints::from([([0, 1, 2, 3], (0.5, 2.0))]);
        let pla = VolumeConstraints::from([([0, 1, 2, 3], (-0.1, 0.1))]);
        let erf = ErrorFunction::new(lmat, umat, &chi, &pla, ErrorWeights::default()).unwrap();
        assert_eq!(erf.volume_constraints().len(), 1);
        assert_eq!(erf.volume_constraints()[&[0, 1, 2, 3]], (-0.1, 0.1));
        assert!(f64_approx_equal(erf.evaluate(&tetrahedron()).unwrap(), 0.81, 1e-12));
    }

    #[test]
    fn weights_scale_their_terms() {
        let (lmat, umat) = uniform_bounds(4, 0.0, 10.0);
        let chi = VolumeConstraints::from([([0, 1, 2, 3], (2.0, 3.0))]);
        let weights = ErrorWeights {
            chirality: 3.0,
            ..ErrorWeights::default()
        };
        let erf = ErrorFunction::new(lmat, umat, &chi, &VolumeConstraints::new(), weights).unwrap();
        assert!(f64_approx_equal(erf.evaluate(&tetrahedron()).unwrap(), 3.0, 1e-12));
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let erf = error_function(4, 0.0, 10.0, VolumeConstraints::new());
        let wrong_rows = DMatrix::zeros(3, 3);
        let wrong_cols = DMatrix::zeros(4, 2);
        assert!(matches!(
            erf.evaluate(&wrong_rows),
            Err(EngineError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            erf.gradient(&wrong_cols),
            Err(EngineError::ShapeMismatch { .. })
        ));

        let (lmat, _) = uniform_bounds(4, 0.0, 1.0);
        let (_, umat) = uniform_bounds(3, 0.0, 1.0);
        assert!(matches!(
            ErrorFunction::new(
                lmat,
                umat,
                &VolumeConstraints::new(),
                &VolumeConstraints::new(),
                ErrorWeights::default()
            ),
            Err(EngineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn constraints_must_reference_existing_atoms() {
        let (lmat, umat) = uniform_bounds(4, 0.0, 1.0);
        let chi = VolumeConstraints::from([([0, 1, 2, 7], (0.0, 1.0))]);
        assert!(matches!(
            ErrorFunction::new(lmat, umat, &chi, &VolumeConstraints::new(), ErrorWeights::default()),
            Err(EngineError::ConstraintIndex { atoms: 4, .. })
        ));
    }

    #[test]
    fn numerical_gradient_rejects_unsupported_stencils() {
        let erf = error_function(4, 0.0, 10.0, VolumeConstraints::new());
        assert!(matches!(
            erf.numerical_gradient(&tetrahedron(), 6),
            Err(EngineError::UnsupportedStencil { points: 6 })
        ));
    }
}

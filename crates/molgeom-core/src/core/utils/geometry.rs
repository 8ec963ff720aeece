use nalgebra::{DMatrix, Vector3};

#[inline]
fn position(coords: &DMatrix<f64>, idx: usize) -> Vector3<f64> {
    Vector3::new(coords[(idx, 0)], coords[(idx, 1)], coords[(idx, 2)])
}

/// Signed tetrahedral volume of an ordered tetrad of atoms.
///
/// For atoms `(a, b, c, d)` this is `(b - a) . ((c - a) x (d - a))`. Only the
/// Cartesian columns take part; a fourth coordinate column is ignored. The sign
/// encodes the handedness of the arrangement and flips under exchange of any
/// two positions.
pub fn volume(coords: &DMatrix<f64>, idxs: &[usize; 4]) -> f64 {
    let a = position(coords, idxs[0]);
    let b = position(coords, idxs[1]);
    let c = position(coords, idxs[2]);
    let d = position(coords, idxs[3]);
    (b - a).dot(&(c - a).cross(&(d - a)))
}

/// Gradient of [`volume`] with respect to every coordinate.
///
/// The returned matrix has the shape of `coords`. Only the Cartesian columns of
/// the four participating rows are non-zero.
pub fn volume_gradient(coords: &DMatrix<f64>, idxs: &[usize; 4]) -> DMatrix<f64> {
    let a = position(coords, idxs[0]);
    let b = position(coords, idxs[1]);
    let c = position(coords, idxs[2]);
    let d = position(coords, idxs[3]);

    let grad_b = (c - a).cross(&(d - a));
    let grad_c = -(b - a).cross(&(d - a));
    let grad_d = (b - a).cross(&(c - a));
    // The volume is translation invariant, so the first atom balances the rest.
    let grad_a = -(grad_b + grad_c + grad_d);

    let mut grad = DMatrix::zeros(coords.nrows(), coords.ncols());
    for (&idx, g) in idxs.iter().zip([grad_a, grad_b, grad_c, grad_d]) {
        for dim in 0..3 {
            grad[(idx, dim)] += g[dim];
        }
    }
    grad
}

/// Pairwise Euclidean distances between the rows of `coords`.
///
/// Every column contributes, including an auxiliary fourth dimension.
pub fn distance_matrix(coords: &DMatrix<f64>) -> DMatrix<f64> {
    let n = coords.nrows();
    let mut dmat = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = (coords.row(i) - coords.row(j)).norm();
            dmat[(i, j)] = dist;
            dmat[(j, i)] = dist;
        }
    }
    dmat
}

/// First-derivative coefficients for symmetric stencils, listed for offsets
/// `1..=k` (the coefficient for `-m` is the negation of the one for `+m`).
fn stencil_coefficients(points: usize) -> Option<&'static [f64]> {
    const THREE: [f64; 1] = [1.0 / 2.0];
    const FIVE: [f64; 2] = [2.0 / 3.0, -1.0 / 12.0];
    const SEVEN: [f64; 3] = [3.0 / 4.0, -3.0 / 20.0, 1.0 / 60.0];
    const NINE: [f64; 4] = [4.0 / 5.0, -1.0 / 5.0, 4.0 / 105.0, -1.0 / 280.0];
    const ELEVEN: [f64; 5] = [
        5.0 / 6.0,
        -5.0 / 21.0,
        5.0 / 84.0,
        -5.0 / 504.0,
        1.0 / 1260.0,
    ];
    match points {
        3 => Some(&THREE),
        5 => Some(&FIVE),
        7 => Some(&SEVEN),
        9 => Some(&NINE),
        11 => Some(&ELEVEN),
        _ => None,
    }
}

/// Numerical gradient of a scalar function of a coordinate matrix by central
/// differences.
///
/// `points` selects the stencil size (3, 5, 7, 9 or 11) and `step` the spacing.
/// Returns `None` for an unsupported stencil size.
pub fn central_difference<F>(
    f: F,
    coords: &DMatrix<f64>,
    step: f64,
    points: usize,
) -> Option<DMatrix<f64>>
where
    F: Fn(&DMatrix<f64>) -> f64,
{
    let coeffs = stencil_coefficients(points)?;
    let mut grad = DMatrix::zeros(coords.nrows(), coords.ncols());
    let mut shifted = coords.clone();

    for i in 0..coords.nrows() {
        for j in 0..coords.ncols() {
            let origin = coords[(i, j)];
            let mut deriv = 0.0;
            for (m, coeff) in coeffs.iter().enumerate() {
                let offset = (m + 1) as f64 * step;
                shifted[(i, j)] = origin + offset;
                let forward = f(&shifted);
                shifted[(i, j)] = origin - offset;
                let backward = f(&shifted);
                deriv += coeff * (forward - backward);
            }
            shifted[(i, j)] = origin;
            grad[(i, j)] = deriv / step;
        }
    }
    Some(grad)
}

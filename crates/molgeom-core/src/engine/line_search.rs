//! Derivative-free minimization of a scalar function of one variable.
//!
//! A minimum is first bracketed by walking downhill from two starting points,
//! then located by Brent's method (golden-section search with inverse
//! parabolic interpolation).

use super::error::EngineError;

const GOLDEN_RATIO: f64 = 1.618034;
const GOLDEN_SECTION: f64 = 0.381_966_0;
const TINY: f64 = 1e-21;
const MIN_TOLERANCE: f64 = 1e-11;

pub const GROW_LIMIT: f64 = 110.0;
pub const MAX_BRACKET_ITERATIONS: usize = 1000;
pub const TOLERANCE: f64 = 1.48e-8;
pub const MAX_BRENT_ITERATIONS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearchOutcome {
    pub alpha: f64,
    pub value: f64,
    pub iterations: usize,
}

/// Three abscissae with `f(b)` no larger than `f(a)` and `f(c)`, and `b`
/// between `a` and `c`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub fa: f64,
    pub fb: f64,
    pub fc: f64,
}

fn finite(x: f64, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::LineSearch {
            reason: format!("objective is not finite at alpha = {x}: {value}"),
        })
    }
}

/// Brackets a minimum by stepping downhill from `xa` and `xb`.
///
/// Steps grow by the golden ratio, with parabolic extrapolation limited to
/// [`GROW_LIMIT`] times the current step.
pub fn bracket<F>(f: &mut F, xa: f64, xb: f64) -> Result<Bracket, EngineError>
where
    F: FnMut(f64) -> f64,
{
    let mut eval = |x: f64| finite(x, f(x));

    let (mut xa, mut xb) = (xa, xb);
    let (mut fa, mut fb) = (eval(xa)?, eval(xb)?);
    if fa < fb {
        std::mem::swap(&mut xa, &mut xb);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut xc = xb + GOLDEN_RATIO * (xb - xa);
    let mut fc = eval(xc)?;
    let mut iter = 0;

    while fc < fb {
        let tmp1 = (xb - xa) * (fb - fc);
        let tmp2 = (xb - xc) * (fb - fa);
        let val = tmp2 - tmp1;
        let denom = if val.abs() < TINY { 2.0 * TINY } else { 2.0 * val };
        let mut w = xb - ((xb - xc) * tmp2 - (xb - xa) * tmp1) / denom;
        let wlim = xb + GROW_LIMIT * (xc - xb);

        if iter > MAX_BRACKET_ITERATIONS {
            return Err(EngineError::LineSearch {
                reason: format!("no bracket found within {MAX_BRACKET_ITERATIONS} iterations"),
            });
        }
        iter += 1;

        let mut fw;
        if (w - xc) * (xb - w) > 0.0 {
            // Parabolic minimum between b and c.
            fw = eval(w)?;
            if fw < fc {
                return Ok(Bracket {
                    a: xb,
                    b: w,
                    c: xc,
                    fa: fb,
                    fb: fw,
                    fc,
                });
            } else if fw > fb {
                return Ok(Bracket {
                    a: xa,
                    b: xb,
                    c: w,
                    fa,
                    fb,
                    fc: fw,
                });
            }
            w = xc + GOLDEN_RATIO * (xc - xb);
            fw = eval(w)?;
        } else if (w - wlim) * (wlim - xc) >= 0.0 {
            w = wlim;
            fw = eval(w)?;
        } else if (w - wlim) * (xc - w) > 0.0 {
            fw = eval(w)?;
            if fw < fc {
                xb = xc;
                xc = w;
                w = xc + GOLDEN_RATIO * (xc - xb);
                fb = fc;
                fc = fw;
                fw = eval(w)?;
            }
        } else {
            w = xc + GOLDEN_RATIO * (xc - xb);
            fw = eval(w)?;
        }

        xa = xb;
        xb = xc;
        xc = w;
        fa = fb;
        fb = fc;
        fc = fw;
    }

    Ok(Bracket {
        a: xa,
        b: xb,
        c: xc,
        fa,
        fb,
        fc,
    })
}

/// Locates the minimum inside `bracket` by Brent's method.
pub fn brent<F>(f: &mut F, bracket: &Bracket) -> Result<LineSearchOutcome, EngineError>
where
    F: FnMut(f64) -> f64,
{
    let mut eval = |x: f64| finite(x, f(x));

    let (mut a, mut b) = if bracket.a < bracket.c {
        (bracket.a, bracket.c)
    } else {
        (bracket.c, bracket.a)
    };
    let (mut x, mut w, mut v) = (bracket.b, bracket.b, bracket.b);
    let (mut fx, mut fw, mut fv) = (bracket.fb, bracket.fb, bracket.fb);
    let mut deltax: f64 = 0.0;
    let mut rat: f64 = 0.0;

    for iter in 0..MAX_BRENT_ITERATIONS {
        let tol1 = TOLERANCE * x.abs() + MIN_TOLERANCE;
        let tol2 = 2.0 * tol1;
        let xmid = 0.5 * (a + b);
        if (x - xmid).abs() < tol2 - 0.5 * (b - a) {
            return Ok(LineSearchOutcome {
                alpha: x,
                value: fx,
                iterations: iter,
            });
        }

        if deltax.abs() <= tol1 {
            deltax = if x >= xmid { a - x } else { b - x };
            rat = GOLDEN_SECTION * deltax;
        } else {
            // Try a parabolic step through x, w and v.
            let tmp1 = (x - w) * (fx - fv);
            let mut tmp2 = (x - v) * (fx - fw);
            let mut p = (x - v) * tmp2 - (x - w) * tmp1;
            tmp2 = 2.0 * (tmp2 - tmp1);
            if tmp2 > 0.0 {
                p = -p;
            }
            tmp2 = tmp2.abs();
            let dx_temp = deltax;
            deltax = rat;
            if p > tmp2 * (a - x) && p < tmp2 * (b - x) && p.abs() < (0.5 * tmp2 * dx_temp).abs()
            {
                rat = p / tmp2;
                let u = x + rat;
                if (u - a) < tol2 || (b - u) < tol2 {
                    rat = if xmid - x >= 0.0 { tol1 } else { -tol1 };
                }
            } else {
                deltax = if x >= xmid { a - x } else { b - x };
                rat = GOLDEN_SECTION * deltax;
            }
        }

        let u = if rat.abs() < tol1 {
            if rat >= 0.0 { x + tol1 } else { x - tol1 }
        } else {
            x + rat
        };
        let fu = eval(u)?;

        if fu > fx {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                w = u;
                fv = fw;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        } else {
            if u >= x {
                a = x;
            } else {
                b = x;
            }
            v = w;
            w = x;
            x = u;
            fv = fw;
            fw = fx;
            fx = fu;
        }
    }

    Err(EngineError::LineSearch {
        reason: format!("Brent iteration did not converge within {MAX_BRENT_ITERATIONS} iterations"),
    })
}

/// Minimizes `f` over the real line, starting from the points 0 and 1.
pub fn minimize_scalar<F>(mut f: F) -> Result<LineSearchOutcome, EngineError>
where
    F: FnMut(f64) -> f64,
{
    let bracket = bracket(&mut f, 0.0, 1.0)?;
    brent(&mut f, &bracket)
}

//! Root finding for the low-order polynomials that appear in mass balances.
//!
//! Coefficients are always given in ascending order, `coeffs[k]` multiplying
//! `x^k`. Every iterative finder reports whether it actually converged instead
//! of silently handing back its last iterate.

use thiserror::Error;

/// Newton-Raphson iteration cap for cubic roots.
pub const NEWTON_MAX_ITERATIONS: usize = 100;

/// Relative step size below which a Newton iterate counts as converged.
const NEWTON_TOLERANCE: f64 = 1e-14;

/// Relative slack accepted when testing whether a root lies in `[0, upper]`.
const BRACKET_SLACK: f64 = 1e-12;

/// A root together with the information how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    /// Location of the root
    pub value: f64,

    /// Whether the finder met its tolerance
    pub converged: bool,

    /// Iterations spent, zero for closed-form roots
    pub iterations: usize,
}

impl Root {
    fn exact(value: f64) -> Self {
        Self {
            value,
            converged: true,
            iterations: 0,
        }
    }
}

/// Failures of the closed-form quadratic.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RootError {
    /// The discriminant is negative.
    #[error("no real root, discriminant {0:e}")]
    NoRealRoot(f64),

    /// All coefficients multiplying `x` vanish.
    #[error("polynomial has no dependence on x")]
    Degenerate,
}

/// Evaluate a polynomial with Horner's scheme.
pub fn evaluate(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Evaluate the first derivative of a polynomial.
pub fn evaluate_derivative(coeffs: &[f64], x: f64) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0.0, |acc, (k, &c)| acc * x + k as f64 * c)
}

/// Drop leading coefficients that are negligible against the largest one.
pub fn trim(coeffs: &[f64]) -> &[f64] {
    let scale = coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
    let mut len = coeffs.len();
    while len > 1 && coeffs[len - 1].abs() <= f64::EPSILON * scale {
        len -= 1;
    }
    &coeffs[..len]
}

/// Real roots of `a·x² + b·x + c`, smallest first.
///
/// Uses the cancellation-free form `q = -½(b + sign(b)·√D)`, roots `q/a` and
/// `c/q`, so the small root of a strongly-binding mass balance keeps its
/// relative precision. A vanishing `a` degrades to the linear root, returned
/// twice.
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Result<(f64, f64), RootError> {
    if a == 0.0 {
        if b == 0.0 {
            return Err(RootError::Degenerate);
        }
        let root = -c / b;
        return Ok((root, root));
    }

    let mut discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        // rounding noise around a double root
        if discriminant > -4.0 * f64::EPSILON * b * b {
            discriminant = 0.0;
        } else {
            return Err(RootError::NoRealRoot(discriminant));
        }
    }

    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    if q == 0.0 {
        return Ok((0.0, 0.0));
    }
    let r1 = q / a;
    let r2 = c / q;
    Ok((r1.min(r2), r1.max(r2)))
}

fn newton(coeffs: &[f64; 4], start: f64) -> Root {
    let mut x = start;
    for iteration in 1..=NEWTON_MAX_ITERATIONS {
        let f = evaluate(coeffs, x);
        if f == 0.0 {
            return Root {
                value: x,
                converged: true,
                iterations: iteration,
            };
        }
        let df = evaluate_derivative(coeffs, x);
        if df == 0.0 || !df.is_finite() {
            break;
        }
        let step = f / df;
        x -= step;
        if !x.is_finite() {
            break;
        }
        if step.abs() <= NEWTON_TOLERANCE * x.abs().max(f64::MIN_POSITIVE) {
            return Root {
                value: x,
                converged: true,
                iterations: iteration,
            };
        }
    }
    Root {
        value: x,
        converged: false,
        iterations: NEWTON_MAX_ITERATIONS,
    }
}

/// Roots of `a·x³ + b·x² + c·x + d` by Newton-Raphson.
///
/// The starting guesses bracket the extrema of the cubic, which are the roots
/// of its derivative `3a·x² + 2b·x + c`. A monotonic cubic is started from its
/// inflection point. Each entry carries its own convergence flag; duplicates
/// are possible when several guesses reach the same root.
pub fn cubic_roots(a: f64, b: f64, c: f64, d: f64) -> Vec<Root> {
    if a == 0.0 {
        return match quadratic_roots(b, c, d) {
            Ok((r1, r2)) => vec![Root::exact(r1), Root::exact(r2)],
            Err(_) => Vec::new(),
        };
    }

    let coeffs = [d, c, b, a];
    let starts = match quadratic_roots(3.0 * a, 2.0 * b, c) {
        Ok((r1, r2)) => {
            let spread = (r2 - r1)
                .max(r1.abs())
                .max(r2.abs())
                .max(f64::MIN_POSITIVE);
            vec![r1 - spread, 0.5 * (r1 + r2), r2 + spread]
        }
        Err(_) => vec![-b / (3.0 * a)],
    };

    starts.into_iter().map(|x0| newton(&coeffs, x0)).collect()
}

/// The smallest non-negative converged root of `a·x³ + b·x² + c·x + d`.
pub fn smallest_nonnegative_cubic_root(a: f64, b: f64, c: f64, d: f64) -> Option<Root> {
    cubic_roots(a, b, c, d)
        .into_iter()
        .filter(|root| root.converged && root.value >= 0.0)
        .min_by(|x, y| x.value.total_cmp(&y.value))
}

/// Bisection on `[lower, upper]`.
///
/// Stops once the bracket is narrower than `tolerance` (or than what the
/// floating-point spacing at `upper` allows). Without a sign change the end
/// point with the smaller residual is returned, flagged as not converged.
pub fn bisection(
    coeffs: &[f64],
    lower: f64,
    upper: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Root {
    let mut lo = lower;
    let mut hi = upper;
    let f_lo = evaluate(coeffs, lo);
    if f_lo == 0.0 {
        return Root::exact(lo);
    }
    let f_hi = evaluate(coeffs, hi);
    if f_hi == 0.0 {
        return Root::exact(hi);
    }
    if f_lo.signum() == f_hi.signum() {
        return Root {
            value: if f_lo.abs() <= f_hi.abs() { lo } else { hi },
            converged: false,
            iterations: 0,
        };
    }

    let sign_lo = f_lo.signum();
    let width = tolerance.max(4.0 * f64::EPSILON * lower.abs().max(upper.abs()));
    for iteration in 1..=max_iterations {
        let mid = 0.5 * (lo + hi);
        let f = evaluate(coeffs, mid);
        if f == 0.0 {
            return Root {
                value: mid,
                converged: true,
                iterations: iteration,
            };
        }
        if f.signum() == sign_lo {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= width {
            return Root {
                value: 0.5 * (lo + hi),
                converged: true,
                iterations: iteration,
            };
        }
    }

    Root {
        value: 0.5 * (lo + hi),
        converged: false,
        iterations: max_iterations,
    }
}

/// The root of a mass-balance polynomial inside `[0, upper]`.
///
/// Linear and quadratic polynomials (after trimming) are solved in closed
/// form; higher orders, or closed forms without a root in the bracket, fall
/// back to bisection.
pub fn physical_root(coeffs: &[f64], upper: f64, tolerance: f64, max_iterations: usize) -> Root {
    let coeffs = trim(coeffs);
    let upper = upper.max(0.0);
    let slack = BRACKET_SLACK * upper.max(f64::MIN_POSITIVE);
    let in_bracket = |x: f64| x.is_finite() && x >= -slack && x <= upper + slack;

    match coeffs.len() {
        0 => {
            return Root {
                value: 0.0,
                converged: false,
                iterations: 0,
            }
        }
        2 => {
            let root = -coeffs[0] / coeffs[1];
            if in_bracket(root) {
                return Root::exact(root.clamp(0.0, upper));
            }
        }
        3 => {
            if let Ok((r1, r2)) = quadratic_roots(coeffs[2], coeffs[1], coeffs[0]) {
                if let Some(root) = [r1, r2].into_iter().find(|&r| in_bracket(r)) {
                    return Root::exact(root.clamp(0.0, upper));
                }
            }
        }
        _ => {}
    }

    bisection(coeffs, 0.0, upper, tolerance, max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_roots() {
        let (r1, r2) = quadratic_roots(1.0, -3.0, 2.0).unwrap();
        assert_relative_eq!(r1, 1.0, epsilon = 1e-14);
        assert_relative_eq!(r2, 2.0, epsilon = 1e-14);

        assert!(matches!(
            quadratic_roots(1.0, 0.0, 1.0),
            Err(RootError::NoRealRoot(_))
        ));
        assert_eq!(quadratic_roots(0.0, 0.0, 1.0), Err(RootError::Degenerate));
    }

    #[test]
    fn test_quadratic_small_root_keeps_precision() {
        // roots 1e-8 and 1e8; the naive formula loses the small one entirely
        let (small, large) = quadratic_roots(1.0, -(1e8 + 1e-8), 1.0).unwrap();
        assert_relative_eq!(small, 1e-8, max_relative = 1e-12);
        assert_relative_eq!(large, 1e8, max_relative = 1e-12);
    }

    #[test]
    fn test_cubic_three_real_roots() {
        // (x - 1)(x - 2)(x - 3)
        let roots = cubic_roots(1.0, -6.0, 11.0, -6.0);
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().all(|r| r.converged));

        let mut values: Vec<f64> = roots.iter().map(|r| r.value).collect();
        values.sort_by(f64::total_cmp);
        assert_relative_eq!(values[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(values[2], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_smallest_nonnegative_cubic_root() {
        // (x + 1)(x + 2)(x - 0.5) = x³ + 2.5x² + 0.5x - 1
        let root = smallest_nonnegative_cubic_root(1.0, 2.5, 0.5, -1.0).unwrap();
        assert!(root.converged);
        assert_relative_eq!(root.value, 0.5, epsilon = 1e-12);

        // monotonic cubic x³ + x - 2 has the single root 1
        let root = smallest_nonnegative_cubic_root(1.0, 0.0, 1.0, -2.0).unwrap();
        assert_relative_eq!(root.value, 1.0, epsilon = 1e-12);

        // all roots negative
        assert!(smallest_nonnegative_cubic_root(1.0, 6.0, 11.0, 6.0).is_none());
    }

    #[test]
    fn test_bisection() {
        // x³ + x - 1e-3 on [0, 1e-3]
        let coeffs = [-1e-3, 1.0, 0.0, 1.0];
        let root = bisection(&coeffs, 0.0, 1e-3, 1e-16, 200);
        assert!(root.converged);
        assert!(evaluate(&coeffs, root.value).abs() < 1e-14);

        let stalled = bisection(&coeffs, 0.0, 1e-3, 1e-16, 3);
        assert!(!stalled.converged);

        let no_bracket = bisection(&[1.0, 1.0], 0.0, 1.0, 1e-12, 50);
        assert!(!no_bracket.converged);
        assert_eq!(no_bracket.value, 0.0);
    }

    #[test]
    fn test_physical_root() {
        let root = physical_root(&[-2.0, 4.0], 1.0, 1e-12, 100);
        assert!(root.converged);
        assert_relative_eq!(root.value, 0.5);
        assert_eq!(root.iterations, 0);

        // -1e-3 + x + 1e4·x²: only the positive root lies in the bracket
        let root = physical_root(&[-1e-3, 1.0, 1e4], 1e-3, 1e-15, 100);
        assert!(root.value > 0.0 && root.value < 1e-3);
        assert!(evaluate(&[-1e-3, 1.0, 1e4], root.value).abs() < 1e-15);

        // quartic goes through bisection
        let quartic = [-1e-3, 1.0, 10.0, 100.0, 1000.0];
        let root = physical_root(&quartic, 1e-3, 1e-16, 200);
        assert!(root.converged);
        assert!(root.iterations > 0);
        assert!(evaluate(&quartic, root.value).abs() < 1e-14);
    }

    #[test]
    fn test_trim_and_horner() {
        assert_eq!(trim(&[-1.0, 2.0, 1e-30]).len(), 2);
        assert_eq!(trim(&[-1.0, 2.0, 3.0]).len(), 3);
        assert_relative_eq!(evaluate(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_relative_eq!(evaluate_derivative(&[1.0, 2.0, 3.0], 2.0), 14.0);
    }
}

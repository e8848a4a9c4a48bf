//! The least-squares seam between models and the Levenberg-Marquardt loop.
//!
//! The optimizer never sees a titration model directly. `Minimizer` wraps a
//! `ModelAdapter` into a `Problem` over its free parameters, and the tests use
//! small analytic problems.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// A residual vector as a function of a flat parameter vector.
pub trait Problem {
    /// Residuals `r(p)`. The squared norm is the quantity minimized.
    ///
    /// Returning `Err` aborts the fit. A model that merely produced a
    /// non-finite value should return those values instead and let the
    /// optimizer treat the point as unacceptable.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    fn parameter_count(&self) -> usize;

    fn residual_count(&self) -> usize;

    /// `J[i,j] = ∂r_i/∂p_j`, by forward differences unless overridden.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// When false the optimizer differentiates with its own `delta` step
    /// and never calls `jacobian`.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Sum of squared residuals.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Exponential decay y = a·exp(-k·t) sampled without noise.
    struct Decay {
        t: Array1<f64>,
        y: Array1<f64>,
    }

    impl Problem for Decay {
        fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
            let model = self.t.mapv(|t| params[0] * (-params[1] * t).exp());
            Ok(&model - &self.y)
        }

        fn parameter_count(&self) -> usize {
            2
        }

        fn residual_count(&self) -> usize {
            self.t.len()
        }
    }

    #[test]
    fn test_default_jacobian_and_cost() {
        let t = array![0.0, 1.0, 2.0];
        let y = t.mapv(|t: f64| 2.0 * (-0.5 * t).exp());
        let problem = Decay { t, y };

        let params = array![2.0, 0.5];
        assert_relative_eq!(problem.eval_cost(&params).unwrap(), 0.0, epsilon = 1e-24);
        assert!(!problem.has_custom_jacobian());

        let jac = problem.jacobian(&params).unwrap();
        assert_eq!(jac.shape(), &[3, 2]);
        // d/da = exp(-k t), d/dk = -a t exp(-k t)
        assert_relative_eq!(jac[[1, 0]], (-0.5f64).exp(), epsilon = 1e-6);
        assert_relative_eq!(jac[[2, 1]], -4.0 * (-1.0f64).exp(), epsilon = 1e-6);
    }
}

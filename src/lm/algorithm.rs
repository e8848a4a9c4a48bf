//! Implementation of the Levenberg-Marquardt algorithm.
//!
//! The damped normal equations `(JᵀJ + μI)·h = -Jᵀr` are solved with a
//! Cholesky factorization, falling back to LU when the damped matrix is not
//! numerically positive definite.

use log::debug;
use ndarray::{Array1, Array2};
use std::fmt;

use crate::error::{EqFitError, Result};
use crate::problem::Problem;
use crate::utils::finite_difference;
use crate::utils::matrix_convert::{
    nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

use super::config::LmConfig;
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Best parameter values found
    pub params: Array1<f64>,

    /// Residuals at `params`
    pub residuals: Array1<f64>,

    /// Sum of squared residuals at `params`
    pub cost: f64,

    /// Number of iterations performed, rejected steps included
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Why the loop stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,
}

impl LmResult {
    /// Whether one of the convergence tests was met.
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success())?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

fn finish(
    params: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
    iterations: usize,
    func_evals: usize,
    status: ConvergenceStatus,
) -> Result<LmResult> {
    Ok(LmResult {
        params,
        residuals,
        cost,
        iterations,
        func_evals,
        message: status.description(),
        status,
    })
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.dot(residuals)
}

fn max_diagonal(matrix: &Array2<f64>) -> f64 {
    matrix.diag().iter().fold(0.0_f64, |m, &d| m.max(d))
}

/// Solve `(JᵀJ + μI)·h = -g`. Returns `None` if the system is singular or
/// the step is not finite.
fn solve_damped(jtj: &Array2<f64>, gradient: &Array1<f64>, mu: f64) -> Option<Array1<f64>> {
    let mut a = ndarray_to_nalgebra(jtj);
    for i in 0..a.nrows() {
        a[(i, i)] += mu;
    }
    let rhs = -ndarray_vec_to_nalgebra(gradient);

    let solution = match a.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => a.lu().solve(&rhs)?,
    };
    let step = nalgebra_vec_to_ndarray(&solution);
    step.iter().all(|v| v.is_finite()).then_some(step)
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the initial relative damping.
    pub fn with_mu(mut self, mu: f64) -> Self {
        self.config.mu = mu;
        self
    }

    /// Set the gradient, step and residual tolerances.
    pub fn with_tolerances(mut self, epsilon1: f64, epsilon2: f64, epsilon3: f64) -> Self {
        self.config.epsilon1 = epsilon1;
        self.config.epsilon2 = epsilon2;
        self.config.epsilon3 = epsilon3;
        self
    }

    /// Set the relative finite-difference step.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.config.delta = delta;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    fn jacobian<P: Problem>(
        &self,
        problem: &P,
        params: &Array1<f64>,
        residuals: &Array1<f64>,
    ) -> Result<Array2<f64>> {
        if problem.has_custom_jacobian() {
            problem.jacobian(params)
        } else {
            finite_difference::jacobian_at(problem, params, residuals, Some(self.config.delta))
        }
    }

    /// Minimize `‖r(p)‖²` starting from `initial_params`.
    ///
    /// Evaluation errors are propagated. A non-finite objective at the start
    /// or an overflowing damping parameter end the loop with
    /// [`ConvergenceStatus::NumericalError`]; the result then holds the last
    /// accepted point.
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        let n = problem.parameter_count();
        if initial_params.len() != n {
            return Err(EqFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n,
                initial_params.len()
            )));
        }

        let mut params = initial_params;
        let mut residuals = problem.eval(&params)?;
        let mut func_evals = 1;
        if residuals.len() != problem.residual_count() {
            return Err(EqFitError::DimensionMismatch(format!(
                "Expected {} residuals, got {}",
                problem.residual_count(),
                residuals.len()
            )));
        }
        let mut cost = sum_of_squares(&residuals);

        if !cost.is_finite() {
            debug!("objective is not finite at the starting point");
            return finish(params, residuals, cost, 0, func_evals, ConvergenceStatus::NumericalError);
        }
        if n == 0 {
            return finish(
                params,
                residuals,
                cost,
                0,
                func_evals,
                ConvergenceStatus::GradientConvergence,
            );
        }

        let criteria = ConvergenceCriteria::from(&self.config);
        let mut jac = self.jacobian(problem, &params, &residuals)?;
        func_evals += n;
        let mut jtj = jac.t().dot(&jac);
        let mut gradient = jac.t().dot(&residuals);
        let mut region = TrustRegion::new(self.config.mu, max_diagonal(&jtj));
        let mut status = criteria.check(&gradient, cost);
        let mut iterations = 0;

        while status == ConvergenceStatus::Running {
            if iterations >= self.config.max_iterations {
                status = ConvergenceStatus::MaxIterationsReached;
                break;
            }
            iterations += 1;

            let step = match solve_damped(&jtj, &gradient, region.mu) {
                Some(step) => step,
                None => {
                    region.reject();
                    if region.is_exhausted() {
                        status = ConvergenceStatus::NumericalError;
                    }
                    continue;
                }
            };

            if criteria.step_converged(&step, &params) {
                status = ConvergenceStatus::StepConvergence;
                break;
            }

            let trial = &params + &step;
            let trial_residuals = problem.eval(&trial)?;
            func_evals += 1;
            let trial_cost = sum_of_squares(&trial_residuals);

            // linear model: L(0) - L(h) = hᵀ(μh - g)
            let predicted = step.dot(&(&step * region.mu - &gradient));
            let rho = TrustRegion::gain_ratio(cost - trial_cost, predicted);

            if trial_cost.is_finite() && rho > 0.0 {
                params = trial;
                residuals = trial_residuals;
                cost = trial_cost;

                jac = self.jacobian(problem, &params, &residuals)?;
                func_evals += n;
                jtj = jac.t().dot(&jac);
                gradient = jac.t().dot(&residuals);

                region.accept(rho);
                status = criteria.check(&gradient, cost);
            } else {
                region.reject();
                if region.is_exhausted() {
                    debug!("damping overflowed after {} iterations", iterations);
                    status = ConvergenceStatus::NumericalError;
                }
            }
        }

        finish(params, residuals, cost, iterations, func_evals, status)
    }
}

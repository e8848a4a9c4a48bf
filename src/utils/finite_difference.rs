//! Forward-difference Jacobians.
//!
//! Only free parameters ever reach the optimizer, so every column here belongs
//! to a parameter the fit may move. A step that leaves the physical region
//! (the model turns corrupt and its residuals stop being finite) is retried on
//! the other side of the parameter; a column that fails both ways is left at
//! zero, which freezes that parameter for the current iteration.

use log::debug;
use ndarray::{Array1, Array2};

use crate::error::{EqFitError, Result};
use crate::problem::Problem;

/// Default relative step size.
const DEFAULT_EPSILON: f64 = 1e-8;

/// Step for one parameter: `ε·|p|`, or `ε` near zero.
fn step_size(value: f64, epsilon: f64) -> f64 {
    epsilon * value.abs().max(1.0)
}

fn check_len(residuals: &Array1<f64>, expected: usize) -> Result<()> {
    if residuals.len() != expected {
        return Err(EqFitError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            expected,
            residuals.len()
        )));
    }
    Ok(())
}

/// Jacobian `J[i,j] = ∂r_i/∂p_j` at `params`.
///
/// # Arguments
///
/// * `problem` - The problem to evaluate
/// * `params` - The parameter values at which to differentiate
/// * `epsilon` - Relative step size, `1e-8` when `None`
pub fn jacobian(
    problem: &dyn Problem,
    params: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let residuals = problem.eval(params)?;
    jacobian_at(problem, params, &residuals, epsilon)
}

/// Jacobian around residuals the caller already holds.
///
/// The optimizer always has the residuals of the current point, so this
/// costs one evaluation per column.
pub fn jacobian_at(
    problem: &dyn Problem,
    params: &Array1<f64>,
    residuals: &Array1<f64>,
    epsilon: Option<f64>,
) -> Result<Array2<f64>> {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let rows = problem.residual_count();
    check_len(residuals, rows)?;

    let mut jac = Array2::zeros((rows, params.len()));
    let mut stepped = params.clone();
    for (j, &value) in params.iter().enumerate() {
        let h = step_size(value, epsilon);
        let mut column = None;
        for signed in [h, -h] {
            stepped[j] = value + signed;
            let shifted = problem.eval(&stepped)?;
            check_len(&shifted, rows)?;
            if shifted.iter().all(|r| r.is_finite()) {
                column = Some((shifted - residuals) / signed);
                break;
            }
        }
        stepped[j] = value;

        match column {
            Some(column) => jac.column_mut(j).assign(&column),
            None => debug!(
                "parameter {} at {} gives non-finite residuals on both sides, column left at zero",
                j, value
            ),
        }
    }

    Ok(jac)
}

//! Model adapter traits.
//!
//! The fit engine, the confidence engine and the Monte Carlo driver never see
//! a concrete model. They talk to a [`ModelAdapter`]: a parameter vector they
//! may read and write, a `recalculate` step that brings the calculated signal
//! up to date, and the residuals that result. Anything implementing the trait
//! can be fitted and analysed.

use ndarray::Array1;

use crate::config::ErrorMetric;
use crate::error::Result;
use crate::parameters::ParameterVector;

/// A model that can be fitted and statistically analysed.
///
/// Implementations must be cheap enough to clone: parallel jobs give each
/// worker its own copy of the reference model.
pub trait ModelAdapter: Clone + Send + Sync {
    /// Returns a reference to the model's parameters.
    fn parameters(&self) -> &ParameterVector;

    /// Returns a mutable reference to the model's parameters.
    fn parameters_mut(&mut self) -> &mut ParameterVector;

    /// Recompute the calculated signal from the current parameters.
    ///
    /// Numerical trouble (NaN, unphysical concentrations) must not panic or
    /// fail; it sets the corrupt flag instead.
    fn recalculate(&mut self);

    /// Observed minus calculated signal, as of the last `recalculate`.
    fn residuals(&self) -> Array1<f64>;

    /// Returns true if any recalculation since the last `clear_corrupt`
    /// produced unphysical results.
    fn is_corrupt(&self) -> bool;

    /// Reset the corrupt flag.
    fn clear_corrupt(&mut self);

    /// Datapoints whose concentration solve missed its tolerance at the last
    /// `recalculate`. Models without an inner solve report zero.
    fn unconverged_points(&self) -> usize {
        0
    }

    /// Whether parallel jobs may evaluate clones of this model concurrently.
    fn supports_parallel_evaluation(&self) -> bool {
        true
    }

    /// Number of parameters, locked ones included.
    fn parameter_count(&self) -> usize {
        self.parameters().len()
    }

    /// Value of one parameter. Panics if `index` is out of range.
    fn parameter(&self, index: usize) -> f64 {
        self.parameters()[index].value()
    }

    /// Set one parameter; takes effect at the next `recalculate`.
    fn set_parameter(&mut self, index: usize, value: f64) -> Result<()> {
        self.parameters_mut().set_value(index, value)
    }

    /// Returns true if the model itself holds the parameter fixed.
    fn is_locked(&self, index: usize) -> bool {
        self.parameters().get(index).map_or(true, |p| p.locked)
    }

    /// Name of one parameter.
    fn parameter_name(&self, index: usize) -> String {
        self.parameters()
            .get(index)
            .map_or_else(|| format!("p{}", index), |p| p.name.clone())
    }

    /// Returns true for stability constants.
    fn is_global(&self, index: usize) -> bool {
        self.parameters().get(index).map_or(false, |p| p.is_global())
    }

    /// Sum of squared residuals.
    fn sum_of_squares(&self) -> f64 {
        ErrorMetric::SumOfSquares.evaluate(&self.residuals())
    }

    /// Sum of absolute residuals.
    fn sum_of_absolute_residuals(&self) -> f64 {
        ErrorMetric::SumOfAbsolute.evaluate(&self.residuals())
    }

    /// The objective selected by `metric`.
    fn error(&self, metric: ErrorMetric) -> f64 {
        metric.evaluate(&self.residuals())
    }

    /// Checkpoint the parameter values.
    fn export_state(&self) -> Array1<f64> {
        self.parameters().values()
    }

    /// Roll back to a checkpoint and recalculate.
    fn import_state(&mut self, state: &Array1<f64>) -> Result<()> {
        self.parameters_mut().set_values(state)?;
        self.recalculate();
        Ok(())
    }
}

/// A model whose observed data can be swapped out, for resampling methods.
pub trait ResampleAdapter: ModelAdapter {
    /// Observed signal, flattened in the same order as `residuals`.
    fn observed_signal(&self) -> Array1<f64>;

    /// Calculated signal, flattened in the same order as `residuals`.
    fn calculated_signal(&self) -> Array1<f64>;

    /// Replace the observed signal. The length must match `observed_signal`.
    fn replace_observed(&mut self, values: &Array1<f64>) -> Result<()>;
}

/// A model whose datapoints can be dropped, for cross-validation and
/// reduction.
///
/// `residuals` must be ordered point by point, every point contributing the
/// same number of residuals.
pub trait SubsetAdapter: ModelAdapter {
    /// Number of datapoints.
    fn point_count(&self) -> usize;

    /// A copy restricted to the datapoints in `keep`, with the same parameter
    /// layout and values, already recalculated.
    fn subset(&self, keep: &[usize]) -> Result<Self>;
}

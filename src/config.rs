//! Optimizer configuration.
//!
//! A single [`OptimizerConfig`] carries every tunable of the fitting stack:
//! the concentration solver tolerances, the Levenberg-Marquardt settings, the
//! error norm, the confidence sweep step and the worker count. It is plain data
//! so applications can populate it from their own settings store and hand it
//! down verbatim; JSON round-tripping is provided for convenience.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{EqFitError, Result};

/// The objective that fits and confidence sweeps minimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// Sum of squared residuals (error exponent 2).
    #[default]
    SumOfSquares,
    /// Sum of absolute residuals (error exponent 1).
    SumOfAbsolute,
}

impl ErrorMetric {
    /// Map an error exponent to its metric. Only 1 and 2 are supported.
    pub fn from_exponent(exponent: u32) -> Result<Self> {
        match exponent {
            1 => Ok(ErrorMetric::SumOfAbsolute),
            2 => Ok(ErrorMetric::SumOfSquares),
            other => Err(EqFitError::InvalidConfig(format!(
                "error exponent must be 1 or 2, got {}",
                other
            ))),
        }
    }

    /// The error exponent of this metric.
    pub fn exponent(self) -> u32 {
        match self {
            ErrorMetric::SumOfAbsolute => 1,
            ErrorMetric::SumOfSquares => 2,
        }
    }

    /// Evaluate the objective for a residual vector.
    pub fn evaluate(self, residuals: &Array1<f64>) -> f64 {
        match self {
            ErrorMetric::SumOfSquares => residuals.iter().map(|r| r * r).sum(),
            ErrorMetric::SumOfAbsolute => residuals.iter().map(|r| r.abs()).sum(),
        }
    }

    /// Transform residuals so that their sum of squares equals this metric.
    ///
    /// The least-squares machinery always minimizes `Σ r²`; feeding it
    /// `sign(r)·√|r|` turns that into `Σ |r|`.
    pub fn transform(self, residuals: Array1<f64>) -> Array1<f64> {
        match self {
            ErrorMetric::SumOfSquares => residuals,
            ErrorMetric::SumOfAbsolute => residuals.mapv(|r| r.signum() * r.abs().sqrt()),
        }
    }
}

/// Configuration shared by the concentration solvers, the minimizer, the
/// confidence engine and the job manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Convergence threshold of the free-concentration fixed point,
    /// compared against `|ΔcA| + |ΔcB|`. Default: 1e-13
    pub concentration_epsilon: f64,

    /// Iteration cap of the free-concentration fixed point. Default: 1000
    pub concentration_max_iterations: usize,

    /// Levenberg-Marquardt iteration cap. Default: 100
    pub max_iterations: usize,

    /// Initial damping scale, multiplied with the largest diagonal entry of
    /// `JᵀJ`. Default: 1e-3
    pub mu: f64,

    /// Gradient threshold `‖Jᵀr‖∞`. Default: 1e-15
    pub epsilon1: f64,

    /// Relative step threshold `‖h‖ ≤ ε₂(‖p‖ + ε₂)`. Default: 1e-15
    pub epsilon2: f64,

    /// Objective threshold `‖r‖²`. Default: 1e-20
    pub epsilon3: f64,

    /// Relative finite-difference step for the Jacobian. Default: 1e-6
    pub delta: f64,

    /// Objective minimized by fits and confidence sweeps.
    pub error_metric: ErrorMetric,

    /// Step of the confidence sweep. Default: 1e-3
    pub increment: f64,

    /// Step cap of the confidence sweep per direction. Default: 10000
    pub max_steps: usize,

    /// Worker threads used by the job manager. Default: rayon's thread count
    pub thread_count: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            concentration_epsilon: 1e-13,
            concentration_max_iterations: 1000,
            max_iterations: 100,
            mu: 1e-3,
            epsilon1: 1e-15,
            epsilon2: 1e-15,
            epsilon3: 1e-20,
            delta: 1e-6,
            error_metric: ErrorMetric::SumOfSquares,
            increment: 1e-3,
            max_steps: 10_000,
            thread_count: rayon::current_num_threads().max(1),
        }
    }
}

impl OptimizerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread count.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the error metric.
    pub fn with_error_metric(mut self, metric: ErrorMetric) -> Self {
        self.error_metric = metric;
        self
    }

    /// Set the Levenberg-Marquardt iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the concentration solver tolerance and iteration cap.
    pub fn with_concentration_solver(mut self, epsilon: f64, max_iterations: usize) -> Self {
        self.concentration_epsilon = epsilon;
        self.concentration_max_iterations = max_iterations;
        self
    }

    /// Set the confidence sweep step and step cap.
    pub fn with_sweep(mut self, increment: f64, max_steps: usize) -> Self {
        self.increment = increment;
        self.max_steps = max_steps;
        self
    }

    /// Check that every value is in its admissible range.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("concentration_epsilon", self.concentration_epsilon),
            ("mu", self.mu),
            ("delta", self.delta),
            ("increment", self.increment),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EqFitError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("epsilon1", self.epsilon1),
            ("epsilon2", self.epsilon2),
            ("epsilon3", self.epsilon3),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EqFitError::InvalidConfig(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }

        if self.concentration_max_iterations == 0 {
            return Err(EqFitError::InvalidConfig(
                "concentration_max_iterations must be at least 1".to_string(),
            ));
        }
        if self.thread_count == 0 {
            return Err(EqFitError::InvalidConfig(
                "thread_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_defaults_are_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.error_metric.exponent(), 2);
        assert_eq!(config.max_steps, 10_000);
        assert!(config.thread_count >= 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = OptimizerConfig::default().with_thread_count(0);
        assert!(matches!(config.validate(), Err(EqFitError::InvalidConfig(_))));

        let config = OptimizerConfig::default().with_sweep(-1e-3, 10);
        assert!(config.validate().is_err());

        let config = OptimizerConfig::default().with_concentration_solver(1e-12, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_partial_document() {
        let config = OptimizerConfig::from_json(
            r#"{ "thread_count": 3, "error_metric": "sum_of_absolute", "increment": 0.01 }"#,
        )
        .unwrap();
        assert_eq!(config.thread_count, 3);
        assert_eq!(config.error_metric, ErrorMetric::SumOfAbsolute);
        assert_relative_eq!(config.increment, 0.01);
        assert_eq!(config.max_iterations, OptimizerConfig::default().max_iterations);

        let text = config.to_json().unwrap();
        let back = OptimizerConfig::from_json(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_error_metric() {
        let residuals = array![3.0, -4.0];
        assert_relative_eq!(ErrorMetric::SumOfSquares.evaluate(&residuals), 25.0);
        assert_relative_eq!(ErrorMetric::SumOfAbsolute.evaluate(&residuals), 7.0);

        let transformed = ErrorMetric::SumOfAbsolute.transform(residuals.clone());
        assert_relative_eq!(
            ErrorMetric::SumOfSquares.evaluate(&transformed),
            ErrorMetric::SumOfAbsolute.evaluate(&residuals),
            epsilon = 1e-12
        );
        assert!(transformed[1] < 0.0);

        assert_eq!(ErrorMetric::from_exponent(1).unwrap(), ErrorMetric::SumOfAbsolute);
        assert!(ErrorMetric::from_exponent(3).is_err());
    }
}

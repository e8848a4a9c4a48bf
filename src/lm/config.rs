//! Configuration options for the Levenberg-Marquardt algorithm.

use crate::config::OptimizerConfig;

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct LmConfig {
    /// Maximum number of iterations, rejected steps included. Default: 100
    pub max_iterations: usize,

    /// Initial damping relative to the largest diagonal entry of `JᵀJ`. Default: 1e-3
    pub mu: f64,

    /// Tolerance for the gradient `‖Jᵀr‖∞`. Default: 1e-15
    pub epsilon1: f64,

    /// Tolerance for the relative step `‖h‖ / (‖p‖ + ε₂)`. Default: 1e-15
    pub epsilon2: f64,

    /// Tolerance for the objective `‖r‖²`. Default: 1e-20
    pub epsilon3: f64,

    /// Relative finite-difference step. Default: 1e-6
    pub delta: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self::from(&OptimizerConfig::default())
    }
}

impl From<&OptimizerConfig> for LmConfig {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            mu: config.mu,
            epsilon1: config.epsilon1,
            epsilon2: config.epsilon2,
            epsilon3: config.epsilon3,
            delta: config.delta,
        }
    }
}

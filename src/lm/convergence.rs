//! Convergence criteria for the Levenberg-Marquardt loop.

use ndarray::Array1;

use super::config::LmConfig;

/// Possible convergence states of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The gradient `‖Jᵀr‖∞` fell below ε₁.
    GradientConvergence,

    /// The step became negligible against the parameters (ε₂).
    StepConvergence,

    /// The objective fell below ε₃.
    ResidualConvergence,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// The objective became non-finite or the damping overflowed.
    NumericalError,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::StepConvergence
                | ConvergenceStatus::ResidualConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> String {
        match self {
            ConvergenceStatus::Running => "Optimization is still running".to_string(),
            ConvergenceStatus::GradientConvergence => "Converged: small gradient".to_string(),
            ConvergenceStatus::StepConvergence => "Converged: small parameter step".to_string(),
            ConvergenceStatus::ResidualConvergence => "Converged: small residual".to_string(),
            ConvergenceStatus::MaxIterationsReached => {
                "Terminated: maximum iterations reached".to_string()
            }
            ConvergenceStatus::NumericalError => "Terminated: numerical error".to_string(),
        }
    }
}

/// Stopping thresholds of the optimizer.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for the gradient ∞-norm.
    pub epsilon1: f64,

    /// Tolerance for the relative step.
    pub epsilon2: f64,

    /// Tolerance for the objective.
    pub epsilon3: f64,
}

impl From<&LmConfig> for ConvergenceCriteria {
    fn from(config: &LmConfig) -> Self {
        Self {
            epsilon1: config.epsilon1,
            epsilon2: config.epsilon2,
            epsilon3: config.epsilon3,
        }
    }
}

fn l2_norm(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

impl ConvergenceCriteria {
    /// `‖g‖∞ ≤ ε₁`
    pub fn gradient_converged(&self, gradient: &Array1<f64>) -> bool {
        gradient.iter().fold(0.0_f64, |m, g| m.max(g.abs())) <= self.epsilon1
    }

    /// `‖h‖ ≤ ε₂·(‖p‖ + ε₂)`
    pub fn step_converged(&self, step: &Array1<f64>, params: &Array1<f64>) -> bool {
        l2_norm(step) <= self.epsilon2 * (l2_norm(params) + self.epsilon2)
    }

    /// `‖r‖² ≤ ε₃`
    pub fn residual_converged(&self, cost: f64) -> bool {
        cost <= self.epsilon3
    }

    /// Status after an accepted step.
    pub fn check(&self, gradient: &Array1<f64>, cost: f64) -> ConvergenceStatus {
        if self.gradient_converged(gradient) {
            ConvergenceStatus::GradientConvergence
        } else if self.residual_converged(cost) {
            ConvergenceStatus::ResidualConvergence
        } else {
            ConvergenceStatus::Running
        }
    }
}

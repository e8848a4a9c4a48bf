//! Damping control for the Levenberg-Marquardt algorithm.
//!
//! The damping parameter `μ` is adapted from the gain ratio between the actual
//! and the predicted reduction of the objective, following Nielsen's update:
//! accepted steps shrink `μ` by `max(1/3, 1 - (2ρ - 1)³)`, rejected steps grow
//! it by a factor `ν` that doubles on every consecutive rejection.

/// Largest damping before the loop gives up.
const MAX_DAMPING: f64 = 1e300;

/// Damping state of one minimization.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub mu: f64,

    /// Growth factor applied on the next rejection
    nu: f64,
}

impl TrustRegion {
    /// Start with `μ = τ·max diag(JᵀJ)`.
    ///
    /// # Arguments
    ///
    /// * `tau` - Relative initial damping
    /// * `max_diagonal` - Largest diagonal entry of `JᵀJ`
    pub fn new(tau: f64, max_diagonal: f64) -> Self {
        let scale = if max_diagonal > 0.0 { max_diagonal } else { 1.0 };
        Self {
            mu: tau * scale,
            nu: 2.0,
        }
    }

    /// Update after an accepted step with gain ratio `rho`.
    pub fn accept(&mut self, rho: f64) {
        let factor = 1.0 - (2.0 * rho - 1.0).powi(3);
        self.mu *= factor.max(1.0 / 3.0);
        self.nu = 2.0;
    }

    /// Update after a rejected step.
    pub fn reject(&mut self) {
        self.mu *= self.nu;
        self.nu *= 2.0;
    }

    /// Returns true once the damping has overflowed.
    pub fn is_exhausted(&self) -> bool {
        !self.mu.is_finite() || self.mu > MAX_DAMPING
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// # Arguments
    ///
    /// * `actual_reduction` - Decrease of the objective achieved by the step
    /// * `predicted_reduction` - Decrease predicted by the linear model
    ///
    /// # Returns
    ///
    /// * The gain ratio (actual reduction / predicted reduction)
    pub fn gain_ratio(actual_reduction: f64, predicted_reduction: f64) -> f64 {
        if predicted_reduction > 0.0 {
            actual_reduction / predicted_reduction
        } else if actual_reduction > 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

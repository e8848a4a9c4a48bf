//! Free-concentration solvers.
//!
//! Given the total concentrations `(A0, B0)` of one datapoint and the
//! stability constants of a binding model, a solver returns the free
//! concentrations `(cA, cB)` that satisfy both mass balances
//!
//! ```text
//! A0 = cA + Σ a·β(a,b)·cA^a·cB^b
//! B0 = cB + Σ b·β(a,b)·cA^a·cB^b
//! ```
//!
//! The general [`PolynomialSolver`] handles any stoichiometry; the solvers in
//! [`special`] exploit the structure of the common small models.

pub mod constants;
pub mod equilibrium;
pub mod roots;
pub mod special;

use std::fmt;
use std::sync::Arc;

use crate::config::OptimizerConfig;
use crate::interrupt::Interrupt;

pub use constants::{Species, StabilityConstants};
pub use equilibrium::PolynomialSolver;
pub use special::{OneOneOneTwoSolver, OneToOneSolver, TwoOneOneOneSolver, TwoOneOneTwoSolver};

/// Iteration cap of the bisection fallback inside one fixed-point half-step.
pub(crate) const BISECTION_MAX_ITERATIONS: usize = 200;

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// A total was at the floor, the free concentrations are the totals.
    Trivial,
    /// The convergence test passed.
    Converged,
    /// The iteration cap was hit, the last iterate is returned.
    NotConverged,
    /// The interrupt flag was raised, the last iterate is returned.
    Interrupted,
}

impl SolveStatus {
    /// Returns true for solves whose result can be trusted.
    pub fn is_converged(self) -> bool {
        matches!(self, SolveStatus::Trivial | SolveStatus::Converged)
    }
}

/// Free concentrations of one datapoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equilibrium {
    /// Free A concentration
    pub a: f64,
    /// Free B concentration
    pub b: f64,
    /// Outer iterations spent
    pub iterations: usize,
    /// How the solve ended
    pub status: SolveStatus,
}

impl Equilibrium {
    /// The short-circuit result for a vanishing total.
    pub fn trivial(a0: f64, b0: f64) -> Self {
        Self {
            a: a0,
            b: b0,
            iterations: 0,
            status: SolveStatus::Trivial,
        }
    }

    /// Returns false for NaN/Inf, negative or above-total free concentrations.
    pub fn is_physical(&self, a0: f64, b0: f64) -> bool {
        let within = |c: f64, total: f64| {
            c.is_finite() && c >= 0.0 && c <= total * (1.0 + 1e-8) + f64::MIN_POSITIVE
        };
        within(self.a, a0) && within(self.b, b0)
    }

    /// Concentration of a complex species at this equilibrium.
    pub fn complex(&self, constants: &StabilityConstants, species: Species) -> f64 {
        constants.complex_concentration(species, self.a, self.b)
    }
}

/// Tolerances shared by all solvers.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Threshold on `|ΔcA| + |ΔcB|`, also the floor for the short circuit
    pub epsilon: f64,
    /// Outer iteration cap
    pub max_iterations: usize,
    /// Polled once per outer iteration
    pub interrupt: Option<Interrupt>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::from(&OptimizerConfig::default())
    }
}

impl From<&OptimizerConfig> for SolverConfig {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            epsilon: config.concentration_epsilon,
            max_iterations: config.concentration_max_iterations,
            interrupt: None,
        }
    }
}

impl SolverConfig {
    /// Attach an interrupt flag.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub(crate) fn interrupted(&self) -> bool {
        self.interrupt.as_ref().map_or(false, Interrupt::is_triggered)
    }

    pub(crate) fn is_trivial(&self, a0: f64, b0: f64) -> bool {
        a0 <= self.epsilon || b0 <= self.epsilon
    }
}

/// A strategy for computing free concentrations.
pub trait EquilibriumSolver: fmt::Debug + Send + Sync {
    /// Solve the mass balances of one datapoint.
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium;

    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Tolerances this solver was built with.
    fn config(&self) -> &SolverConfig;

    /// A solver of the same kind running with `config`.
    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver>;
}

/// Pick the cheapest solver able to handle a species set.
///
/// 1:1, 2:1/1:1, 1:1/1:2 and 2:1/1:1/1:2 get their dedicated solvers; every
/// other combination goes through the general polynomial fixed point.
pub fn solver_for(species: &[Species], config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
    let mut set: Vec<(u32, u32)> = species.iter().map(|s| (s.a, s.b)).collect();
    set.sort_unstable();
    set.dedup();

    match set.as_slice() {
        [(1, 1)] => Arc::new(OneToOneSolver::new(config)),
        [(1, 1), (2, 1)] => Arc::new(TwoOneOneOneSolver::new(config)),
        [(1, 1), (1, 2)] => Arc::new(OneOneOneTwoSolver::new(config)),
        [(1, 1), (1, 2), (2, 1)] => Arc::new(TwoOneOneTwoSolver::new(config)),
        _ => Arc::new(PolynomialSolver::new(config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_selection() {
        let config = SolverConfig::default();
        let pick = |species: &[Species]| solver_for(species, config.clone()).name();

        assert_eq!(pick(&[Species::new(1, 1)]), "1:1");
        assert_eq!(pick(&[Species::new(2, 1), Species::new(1, 1)]), "2:1/1:1");
        assert_eq!(pick(&[Species::new(1, 1), Species::new(1, 2)]), "1:1/1:2");
        assert_eq!(
            pick(&[Species::new(1, 2), Species::new(2, 1), Species::new(1, 1)]),
            "2:1/1:1/1:2"
        );
        assert_eq!(pick(&[Species::new(2, 2)]), "polynomial");
        assert_eq!(pick(&[Species::new(1, 1), Species::new(2, 2)]), "polynomial");
    }

    #[test]
    fn test_physical_check() {
        let eq = Equilibrium {
            a: 5e-4,
            b: 1e-3,
            iterations: 3,
            status: SolveStatus::Converged,
        };
        assert!(eq.is_physical(1e-3, 1e-3));
        assert!(!eq.is_physical(4e-4, 1e-3));

        let eq = Equilibrium { a: f64::NAN, ..eq };
        assert!(!eq.is_physical(1e-3, 1e-3));

        let eq = Equilibrium { a: -1e-9, ..eq };
        assert!(!eq.is_physical(1e-3, 1e-3));

        assert!(SolveStatus::Trivial.is_converged());
        assert!(!SolveStatus::Interrupted.is_converged());
    }
}

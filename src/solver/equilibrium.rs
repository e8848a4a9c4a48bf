//! General AxBy fixed-point solver.

use log::debug;
use std::sync::Arc;

use super::roots::physical_root;
use super::{
    Equilibrium, EquilibriumSolver, SolveStatus, SolverConfig, StabilityConstants,
    BISECTION_MAX_ITERATIONS,
};

/// Alternating fixed point shared by the polynomial solvers.
///
/// Starts from `cA = cB = min(A0, B0) / (10·(max_a + max_b))`, then
/// alternately solves the A balance with `cB` held fixed and the B balance
/// with the new `cA`, until `|ΔcA| + |ΔcB| < ε` or the cap is reached.
pub(crate) fn alternate<FA, FB>(
    config: &SolverConfig,
    a0: f64,
    b0: f64,
    species_span: usize,
    mut solve_a: FA,
    mut solve_b: FB,
) -> Equilibrium
where
    FA: FnMut(f64) -> f64,
    FB: FnMut(f64) -> f64,
{
    if config.is_trivial(a0, b0) {
        return Equilibrium::trivial(a0, b0);
    }

    let mut ca = a0.min(b0) / (10.0 * species_span as f64);
    let mut cb = ca;
    for iteration in 1..=config.max_iterations {
        if config.interrupted() {
            return Equilibrium {
                a: ca,
                b: cb,
                iterations: iteration - 1,
                status: SolveStatus::Interrupted,
            };
        }

        let (previous_a, previous_b) = (ca, cb);
        ca = solve_a(cb);
        cb = solve_b(ca);

        if (ca - previous_a).abs() + (cb - previous_b).abs() < config.epsilon {
            return Equilibrium {
                a: ca,
                b: cb,
                iterations: iteration,
                status: SolveStatus::Converged,
            };
        }
    }

    debug!(
        "free concentrations for A0 = {:e}, B0 = {:e} did not converge in {} iterations",
        a0, b0, config.max_iterations
    );
    Equilibrium {
        a: ca,
        b: cb,
        iterations: config.max_iterations,
        status: SolveStatus::NotConverged,
    }
}

/// Solver for arbitrary stoichiometries.
///
/// Each half-step builds the mass-balance polynomial of one component, with
/// the other component's free concentration folded into the coefficients:
///
/// ```text
/// A:  -A0 + cA·(1 + ...) + Σ_a [Σ_b a·β(a,b)·cB^b]·cA^a = 0
/// ```
///
/// and takes its root inside `[0, A0]` (closed form up to quadratics,
/// bisection beyond).
#[derive(Debug, Clone, Default)]
pub struct PolynomialSolver {
    config: SolverConfig,
}

impl PolynomialSolver {
    /// Create a solver with the given tolerances.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Ascending coefficients of the A balance as a polynomial in `cA`.
    fn a_polynomial(constants: &StabilityConstants, a0: f64, cb: f64) -> Vec<f64> {
        let mut coeffs = vec![0.0; constants.max_a() + 1];
        coeffs[0] = -a0;
        coeffs[1] = 1.0;
        for (species, beta) in constants.species() {
            coeffs[species.a as usize] += species.a as f64 * beta * cb.powi(species.b as i32);
        }
        coeffs
    }

    /// Ascending coefficients of the B balance as a polynomial in `cB`.
    fn b_polynomial(constants: &StabilityConstants, b0: f64, ca: f64) -> Vec<f64> {
        let mut coeffs = vec![0.0; constants.max_b() + 1];
        coeffs[0] = -b0;
        coeffs[1] = 1.0;
        for (species, beta) in constants.species() {
            coeffs[species.b as usize] += species.b as f64 * beta * ca.powi(species.a as i32);
        }
        coeffs
    }
}

impl EquilibriumSolver for PolynomialSolver {
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium {
        let tolerance = 0.1 * self.config.epsilon;
        alternate(
            &self.config,
            a0,
            b0,
            constants.max_a() + constants.max_b(),
            |cb| {
                let coeffs = Self::a_polynomial(constants, a0, cb);
                physical_root(&coeffs, a0, tolerance, BISECTION_MAX_ITERATIONS).value
            },
            |ca| {
                let coeffs = Self::b_polynomial(constants, b0, ca);
                physical_root(&coeffs, b0, tolerance, BISECTION_MAX_ITERATIONS).value
            },
        )
    }

    fn name(&self) -> &'static str {
        "polynomial"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
        Arc::new(Self::new(config))
    }
}

//! Dedicated solvers for the common small binding models.
//!
//! All of them read the overall constants `β11`, `β21`, `β12` from the table
//! and ignore any other species.

use log::debug;
use std::sync::Arc;

use super::equilibrium::alternate;
use super::roots::{physical_root, quadratic_roots, smallest_nonnegative_cubic_root, Root};
use super::{
    Equilibrium, EquilibriumSolver, SolveStatus, SolverConfig, StabilityConstants,
    BISECTION_MAX_ITERATIONS,
};

/// Concentration of the 1:1 complex from the closed-form quadratic
/// `K·x² - (K·A0 + K·B0 + 1)·x + K·A0·B0 = 0`, smaller root.
pub fn one_to_one_complex(k: f64, a0: f64, b0: f64) -> f64 {
    let a = k;
    let b = -(k * a0 + k * b0 + 1.0);
    let c = k * a0 * b0;
    match quadratic_roots(a, b, c) {
        Ok((complex, _)) => complex.clamp(0.0, a0.min(b0)),
        Err(_) => 0.0,
    }
}

/// Exact 1:1 solver.
#[derive(Debug, Clone, Default)]
pub struct OneToOneSolver {
    config: SolverConfig,
}

impl OneToOneSolver {
    /// Create a 1:1 solver
    ///
    /// # Arguments
    ///
    /// * `config` - Only the short-circuit floor `epsilon` is used; the
    ///   closed form needs no iteration
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl EquilibriumSolver for OneToOneSolver {
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium {
        if self.config.is_trivial(a0, b0) {
            return Equilibrium::trivial(a0, b0);
        }
        let complex = one_to_one_complex(constants.beta(1, 1), a0, b0);
        Equilibrium {
            a: (a0 - complex).max(0.0),
            b: (b0 - complex).max(0.0),
            iterations: 0,
            status: SolveStatus::Converged,
        }
    }

    fn name(&self) -> &'static str {
        "1:1"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
        Arc::new(Self::new(config))
    }
}

/// Physical root of a mass-balance cubic `a·x³ + b·x² + c·x + d` in
/// `[0, total]`, Newton first and bisection if Newton fails.
fn mass_balance_cubic(config: &SolverConfig, coeffs: [f64; 4], total: f64) -> Root {
    let [d, c, b, a] = coeffs;
    let newton = smallest_nonnegative_cubic_root(a, b, c, d)
        .filter(|root| root.value <= total * (1.0 + 1e-10));
    match newton {
        Some(root) => Root {
            value: root.value.min(total),
            ..root
        },
        None => {
            debug!("cubic Newton failed for total {:e}, bisecting", total);
            physical_root(&coeffs, total, 0.1 * config.epsilon, BISECTION_MAX_ITERATIONS)
        }
    }
}

fn from_root(root: Root, a: f64, b: f64) -> Equilibrium {
    Equilibrium {
        a,
        b,
        iterations: root.iterations,
        status: if root.converged {
            SolveStatus::Converged
        } else {
            SolveStatus::NotConverged
        },
    }
}

/// 2:1/1:1 solver: one cubic in the free host.
///
/// ```text
/// β21·cA³ + (β11 + 2·β21·B0 - β21·A0)·cA² + (1 + β11·(B0 - A0))·cA - A0 = 0
/// cB = B0 / (1 + β11·cA + β21·cA²)
/// ```
#[derive(Debug, Clone, Default)]
pub struct TwoOneOneOneSolver {
    config: SolverConfig,
}

impl TwoOneOneOneSolver {
    /// Create a 2:1/1:1 solver
    ///
    /// # Arguments
    ///
    /// * `config` - Newton tolerance and iteration cap of the cubic in `cA`
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl EquilibriumSolver for TwoOneOneOneSolver {
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium {
        if self.config.is_trivial(a0, b0) {
            return Equilibrium::trivial(a0, b0);
        }
        let b11 = constants.beta(1, 1);
        let b21 = constants.beta(2, 1);
        let coeffs = [
            -a0,
            1.0 + b11 * (b0 - a0),
            b11 + 2.0 * b21 * b0 - b21 * a0,
            b21,
        ];
        let root = mass_balance_cubic(&self.config, coeffs, a0);
        let ca = root.value;
        let cb = b0 / (1.0 + b11 * ca + b21 * ca * ca);
        from_root(root, ca, cb)
    }

    fn name(&self) -> &'static str {
        "2:1/1:1"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
        Arc::new(Self::new(config))
    }
}

/// 1:1/1:2 solver: one cubic in the free guest.
///
/// ```text
/// β12·cB³ + (β11 + 2·β12·A0 - β12·B0)·cB² + (1 + β11·(A0 - B0))·cB - B0 = 0
/// cA = A0 / (1 + β11·cB + β12·cB²)
/// ```
#[derive(Debug, Clone, Default)]
pub struct OneOneOneTwoSolver {
    config: SolverConfig,
}

impl OneOneOneTwoSolver {
    /// Create a 1:1/1:2 solver
    ///
    /// # Arguments
    ///
    /// * `config` - Newton tolerance and iteration cap of the cubic in `cB`
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl EquilibriumSolver for OneOneOneTwoSolver {
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium {
        if self.config.is_trivial(a0, b0) {
            return Equilibrium::trivial(a0, b0);
        }
        let b11 = constants.beta(1, 1);
        let b12 = constants.beta(1, 2);
        let coeffs = [
            -b0,
            1.0 + b11 * (a0 - b0),
            b11 + 2.0 * b12 * a0 - b12 * b0,
            b12,
        ];
        let root = mass_balance_cubic(&self.config, coeffs, b0);
        let cb = root.value;
        let ca = a0 / (1.0 + b11 * cb + b12 * cb * cb);
        from_root(root, ca, cb)
    }

    fn name(&self) -> &'static str {
        "1:1/1:2"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
        Arc::new(Self::new(config))
    }
}

/// 2:1/1:1/1:2 solver: alternating substitution between two quadratics.
///
/// ```text
/// 2·β21·cB·cA² + (1 + β11·cB + β12·cB²)·cA - A0 = 0
/// 2·β12·cA·cB² + (1 + β11·cA + β21·cA²)·cB - B0 = 0
/// ```
#[derive(Debug, Clone, Default)]
pub struct TwoOneOneTwoSolver {
    config: SolverConfig,
}

impl TwoOneOneTwoSolver {
    /// Create a 2:1/1:1/1:2 solver
    ///
    /// # Arguments
    ///
    /// * `config` - Fixed-point tolerance on `|ΔcA| + |ΔcB|`, iteration cap
    ///   and interrupt flag
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

impl EquilibriumSolver for TwoOneOneTwoSolver {
    fn solve(&self, constants: &StabilityConstants, a0: f64, b0: f64) -> Equilibrium {
        let b11 = constants.beta(1, 1);
        let b21 = constants.beta(2, 1);
        let b12 = constants.beta(1, 2);
        let tolerance = 0.1 * self.config.epsilon;
        alternate(
            &self.config,
            a0,
            b0,
            4,
            |cb| {
                let coeffs = [-a0, 1.0 + b11 * cb + b12 * cb * cb, 2.0 * b21 * cb];
                physical_root(&coeffs, a0, tolerance, BISECTION_MAX_ITERATIONS).value
            },
            |ca| {
                let coeffs = [-b0, 1.0 + b11 * ca + b21 * ca * ca, 2.0 * b12 * ca];
                physical_root(&coeffs, b0, tolerance, BISECTION_MAX_ITERATIONS).value
            },
        )
    }

    fn name(&self) -> &'static str {
        "2:1/1:1/1:2"
    }

    fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn with_config(&self, config: SolverConfig) -> Arc<dyn EquilibriumSolver> {
        Arc::new(Self::new(config))
    }
}

//! # eqfit-rs
//!
//! `eqfit-rs` fits chemical binding models to titration data. It solves the
//! coupled mass balances of host–guest systems for the free concentrations,
//! fits stability constants and signal parameters with a Levenberg-Marquardt
//! loop, and estimates parameter uncertainty from confidence profiles and
//! Monte Carlo resampling.
//!
//! The library provides:
//! - Concentration solvers for 1:1, 2:1, 1:2, 2:1/1:1/1:2 and arbitrary AxBy models
//! - A [`ModelAdapter`] trait that decouples models from the fitting machinery
//! - A data-driven [`TitrationModel`](models::TitrationModel) with NMR and UV/Vis signals
//! - A [`Minimizer`] with parameter locking and best-seen tracking
//! - Confidence profiles, F-test model comparison, Monte Carlo,
//!   cross-validation and reduction on a bounded thread pool
//!
//! ## Basic Usage
//!
//! ```
//! use eqfit_rs::solver::{solver_for, EquilibriumSolver, Species, SolverConfig, StabilityConstants};
//!
//! let species = [Species::new(1, 1)];
//! let constants = StabilityConstants::from_species(&species, &[4.0]).unwrap();
//! let solver = solver_for(&species, SolverConfig::default());
//!
//! let free = solver.solve(&constants, 1e-3, 2e-3);
//! assert!(free.status.is_converged());
//! assert!(free.a < 1e-3);
//! ```

pub mod config;
pub mod error;
pub mod interrupt;
pub mod jobs;
pub mod lm;
pub mod minimizer;
pub mod model;
pub mod models;
pub mod parameters;
pub mod problem;
pub mod solver;
pub mod statistics;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_models;

// Re-exports for convenience
pub use config::{ErrorMetric, OptimizerConfig};
pub use error::{EqFitError, Result};
pub use interrupt::Interrupt;
pub use jobs::{ConfidenceReport, Job, JobManager, JobResult, ParameterSelection};
pub use lm::LevenbergMarquardt;
pub use minimizer::{FitOutcome, FitStatus, Minimizer, MinimizerState};
pub use model::{ModelAdapter, ResampleAdapter, SubsetAdapter};
pub use problem::Problem;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

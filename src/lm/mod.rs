//! Levenberg-Marquardt algorithm implementation.
//!
//! This module contains the core optimizer used by the [`Minimizer`](crate::minimizer::Minimizer):
//! Nielsen-damped Levenberg-Marquardt on forward-difference Jacobians.

mod algorithm;
pub mod config;
pub mod convergence;
pub mod trust_region;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use trust_region::TrustRegion;

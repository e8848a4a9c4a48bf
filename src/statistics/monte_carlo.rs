//! # Monte Carlo resampling
//!
//! Each trial adds Gaussian noise to the calculated signal of a fitted model,
//! refits a clone of the model against that synthetic data and records the
//! parameters. The spread of the refitted parameters estimates their
//! uncertainty without assuming a linear model.
//!
//! Noise is drawn up front from one seeded [`StdRng`], so a given seed gives
//! the same datasets no matter how the trials are scheduled.

use log::debug;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::error::{EqFitError, Result};
use crate::minimizer::{FitOutcome, Minimizer};
use crate::model::{ModelAdapter, ResampleAdapter};

use super::summary::{self, ParameterSummary};

/// Settings of a Monte Carlo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub trials: usize,
    /// Noise standard deviation; estimated from the fit when absent
    pub sigma: Option<f64>,
    pub seed: u64,
    /// Percent cut from each tail for the confidence bar
    pub error_percent: f64,
    pub histogram_bins: usize,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: 1000,
            sigma: None,
            seed: 42,
            error_percent: 2.5,
            histogram_bins: 30,
        }
    }
}

impl MonteCarloConfig {
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = Some(sigma);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// Noise level actually used
    pub sigma: f64,
    /// Trials that ran to completion
    pub completed: usize,
    /// Completed trials whose refit converged
    pub converged: usize,
    pub interrupted: bool,
    pub parameters: Vec<ParameterSummary>,
}

/// Residual standard deviation `√(SSE / (n - p))` over the free parameters.
pub fn estimate_sigma<M: ModelAdapter>(model: &M) -> Result<f64> {
    let residuals = model.residuals();
    let n = residuals.len();
    let p = model.parameters().free_indices().len();
    if n <= p {
        return Err(EqFitError::InvalidInput(format!(
            "{} residuals leave no degrees of freedom for {} free parameters",
            n, p
        )));
    }
    Ok((model.sum_of_squares() / (n - p) as f64).sqrt())
}

/// Synthetic observations: calculated signal plus `N(0, σ)` noise.
pub fn synthetic_datasets<M: ResampleAdapter>(
    model: &M,
    config: &MonteCarloConfig,
) -> Result<(f64, Vec<Array1<f64>>)> {
    let sigma = match config.sigma {
        Some(sigma) => sigma,
        None => estimate_sigma(model)?,
    };
    let normal = Normal::new(0.0, sigma).map_err(|e| {
        EqFitError::InvalidConfig(format!("invalid noise level {}: {}", sigma, e))
    })?;

    let calculated = model.calculated_signal();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let datasets = (0..config.trials)
        .map(|_| calculated.mapv(|c| c + normal.sample(&mut rng)))
        .collect();
    Ok((sigma, datasets))
}

/// Refit a clone of `model` against one synthetic dataset.
pub fn run_trial<M: ResampleAdapter>(
    model: &M,
    observed: &Array1<f64>,
    optimizer: &OptimizerConfig,
) -> Result<FitOutcome> {
    let mut trial = model.clone();
    trial.replace_observed(observed)?;
    Minimizer::new(optimizer.clone()).minimize(&mut trial, &[])
}

/// Aggregate the outcomes of completed trials.
///
/// `None` entries are trials skipped by an interrupt.
pub fn summarize<M: ModelAdapter>(
    model: &M,
    config: &MonteCarloConfig,
    sigma: f64,
    outcomes: &[Option<FitOutcome>],
) -> MonteCarloResult {
    let completed: Vec<&FitOutcome> = outcomes.iter().flatten().collect();
    let converged = completed.iter().filter(|o| o.is_converged()).count();
    debug!(
        "monte carlo: {} of {} trials completed, {} converged",
        completed.len(),
        outcomes.len(),
        converged
    );

    let parameters = summary::parameter_summaries(
        model,
        &completed,
        config.error_percent,
        config.histogram_bins,
    );

    MonteCarloResult {
        sigma,
        completed: completed.len(),
        converged,
        interrupted: completed.len() < outcomes.len(),
        parameters,
    }
}

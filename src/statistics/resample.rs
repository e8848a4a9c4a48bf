//! # Cross-validation and reduction
//!
//! Both methods refit the model on subsets of its datapoints and look at how
//! far the parameters move. Cross-validation leaves one, two or `x` points
//! out at a time; reduction drops points cumulatively from the end of the
//! titration or from its start (right after the first point). A parameter
//! that wanders when a few points go missing is poorly defined by the data.
//!
//! Each refit also predicts the points it did not see, giving a held-out
//! error for the subset.

use std::collections::HashSet;

use log::debug;
use ndarray::{s, Array1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::error::{EqFitError, Result};
use crate::minimizer::{FitOutcome, Minimizer};
use crate::model::SubsetAdapter;

use super::summary::{self, ParameterSummary};

/// Which points a cross-validation leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveOut {
    /// Every single point in turn
    One,
    /// Every pair of points
    Two,
    /// Sets of `x` points, all of them or a random selection
    Many(usize),
}

impl LeaveOut {
    fn size(self) -> usize {
        match self {
            LeaveOut::One => 1,
            LeaveOut::Two => 2,
            LeaveOut::Many(x) => x,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub leave_out: LeaveOut,
    /// Largest number of sets; `Many` draws a random selection when there
    /// are more combinations than this
    pub max_sets: usize,
    pub seed: u64,
    /// Percent cut from each tail for the confidence bar
    pub error_percent: f64,
    pub histogram_bins: usize,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            leave_out: LeaveOut::One,
            max_sets: 10_000,
            seed: 42,
            error_percent: 2.5,
            histogram_bins: 30,
        }
    }
}

impl CrossValidationConfig {
    pub fn with_leave_out(mut self, leave_out: LeaveOut) -> Self {
        self.leave_out = leave_out;
        self
    }

    pub fn with_max_sets(mut self, max_sets: usize) -> Self {
        self.max_sets = max_sets;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// End of the titration reduction removes points from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionDirection {
    /// Drop the last points
    #[default]
    Tail,
    /// Drop the points after the first one
    Head,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    pub direction: ReductionDirection,
    /// Points every reduced data set keeps
    pub min_points: usize,
    pub error_percent: f64,
    pub histogram_bins: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            direction: ReductionDirection::Tail,
            min_points: 4,
            error_percent: 2.5,
            histogram_bins: 30,
        }
    }
}

impl ReductionConfig {
    pub fn with_direction(mut self, direction: ReductionDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }
}

/// Refit on one subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetFit {
    /// Datapoints the refit did not see
    pub left_out: Vec<usize>,
    /// Full parameter vector after the refit
    pub parameters: Vec<f64>,
    /// Error over the kept points
    pub error: f64,
    /// Error of the refit's prediction at the left-out points
    pub held_out_error: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampleResult {
    /// Refits in set order; interrupted sets are missing
    pub fits: Vec<SubsetFit>,
    pub converged: usize,
    pub interrupted: bool,
    /// Mean of `held_out_error` over the refits
    pub mean_held_out_error: f64,
    pub parameters: Vec<ParameterSummary>,
}

fn binomial(n: usize, k: usize) -> f64 {
    (1..=k).fold(1.0, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

/// Every `size`-subset of `0..n` in lexicographic order.
fn combinations(n: usize, size: usize) -> Vec<Vec<usize>> {
    let mut sets = Vec::new();
    let mut current: Vec<usize> = (0..size).collect();
    loop {
        sets.push(current.clone());
        let mut i = size;
        while i > 0 && current[i - 1] == n - size + i - 1 {
            i -= 1;
        }
        if i == 0 {
            return sets;
        }
        current[i - 1] += 1;
        for j in i..size {
            current[j] = current[j - 1] + 1;
        }
    }
}

/// Left-out sets of a cross-validation over `points` datapoints.
///
/// All combinations are used while there are at most `max_sets` of them,
/// otherwise `max_sets` distinct ones are drawn from the seeded generator.
pub fn leave_out_sets(points: usize, config: &CrossValidationConfig) -> Result<Vec<Vec<usize>>> {
    let size = config.leave_out.size();
    if size == 0 || size + 1 >= points {
        return Err(EqFitError::InvalidConfig(format!(
            "cannot leave {} of {} datapoints out",
            size, points
        )));
    }
    if config.max_sets == 0 {
        return Err(EqFitError::InvalidConfig(
            "max_sets must be at least 1".to_string(),
        ));
    }

    let total = binomial(points, size);
    if !matches!(config.leave_out, LeaveOut::Many(_)) || total <= config.max_sets as f64 {
        return Ok(combinations(points, size));
    }

    debug!(
        "drawing {} of {:e} combinations of {} points",
        config.max_sets, total, size
    );
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut seen = HashSet::with_capacity(config.max_sets);
    let mut sets = Vec::with_capacity(config.max_sets);
    while sets.len() < config.max_sets {
        let mut set = rand::seq::index::sample(&mut rng, points, size).into_vec();
        set.sort_unstable();
        if seen.insert(set.clone()) {
            sets.push(set);
        }
    }
    Ok(sets)
}

/// Left-out sets of a reduction over `points` datapoints.
///
/// The tail direction drops `points - k` trailing points for
/// `k = points - 1` down to `min_points`; the head direction drops points
/// `1..=i` in the same number of steps. The first point always stays.
pub fn reduction_sets(points: usize, config: &ReductionConfig) -> Result<Vec<Vec<usize>>> {
    if config.min_points < 2 || points <= config.min_points {
        return Err(EqFitError::InvalidConfig(format!(
            "cannot reduce {} datapoints to {}",
            points, config.min_points
        )));
    }
    let tail = (config.min_points..points)
        .rev()
        .map(|k| (k..points).collect::<Vec<usize>>());
    let head = (1..=points - config.min_points).map(|i| (1..=i).collect::<Vec<usize>>());
    Ok(match config.direction {
        ReductionDirection::Tail => tail.collect(),
        ReductionDirection::Head => head.collect(),
        ReductionDirection::Both => tail.chain(head).collect(),
    })
}

/// Refit `model` without the points in `left_out` and predict them.
///
/// # Arguments
///
/// * `model` - Fitted reference model; its parameters start the refit
/// * `left_out` - Sorted datapoints to drop
/// * `optimizer` - Settings of the refit
pub fn refit_subset<M: SubsetAdapter>(
    model: &M,
    left_out: &[usize],
    optimizer: &OptimizerConfig,
) -> Result<(SubsetFit, FitOutcome)> {
    let points = model.point_count();
    let keep: Vec<usize> = (0..points).filter(|i| left_out.binary_search(i).is_err()).collect();
    let mut reduced = model.subset(&keep)?;
    let outcome = Minimizer::new(optimizer.clone()).minimize(&mut reduced, &[])?;

    let mut full = model.clone();
    full.import_state(&outcome.parameters)?;
    let residuals = full.residuals();
    let per_point = residuals.len() / points.max(1);
    let held_out: Array1<f64> = left_out
        .iter()
        .flat_map(|&i| residuals.slice(s![i * per_point..(i + 1) * per_point]).to_vec())
        .collect();

    let fit = SubsetFit {
        left_out: left_out.to_vec(),
        parameters: outcome.parameters.to_vec(),
        error: outcome.error,
        held_out_error: optimizer.error_metric.evaluate(&held_out),
        converged: outcome.is_converged(),
    };
    Ok((fit, outcome))
}

/// Aggregate the refits. `None` entries are sets skipped by an interrupt.
pub fn summarize<M: SubsetAdapter>(
    model: &M,
    refits: Vec<Option<(SubsetFit, FitOutcome)>>,
    error_percent: f64,
    bins: usize,
) -> ResampleResult {
    let interrupted = refits.iter().any(Option::is_none);
    let (fits, outcomes): (Vec<SubsetFit>, Vec<FitOutcome>) = refits.into_iter().flatten().unzip();
    let converged = fits.iter().filter(|f| f.converged).count();
    let mean_held_out_error = if fits.is_empty() {
        0.0
    } else {
        fits.iter().map(|f| f.held_out_error).sum::<f64>() / fits.len() as f64
    };
    let outcome_refs: Vec<&FitOutcome> = outcomes.iter().collect();
    let parameters = summary::parameter_summaries(model, &outcome_refs, error_percent, bins);

    ResampleResult {
        fits,
        converged,
        interrupted,
        mean_held_out_error,
        parameters,
    }
}

//! # Model comparison
//!
//! A cheaper confidence estimate than a profile. Every other parameter stays
//! at the optimum while one parameter is pushed outwards until the error
//! reaches the F-test ceiling, giving one interval per parameter. An optional
//! box search then scatters seeded random points over a box around those
//! intervals and keeps the points below the ceiling, which maps the joint
//! confidence region including correlations the intervals miss.

use log::debug;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::ErrorMetric;
use crate::error::{EqFitError, Result};
use crate::model::ModelAdapter;

use super::fisher;

/// Settings of a model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// F-test confidence level for the error ceiling
    pub confidence: f64,
    /// Absolute ceiling replacing the F-test
    pub max_error: Option<f64>,
    /// First step away from the optimum
    pub initial_step: f64,
    /// Relative tolerance on `|E - ceiling|`
    pub tolerance: f64,
    /// Evaluations per direction
    pub max_iterations: usize,
    /// Box half-widths as multiples of the interval half-widths
    pub box_multiplier: f64,
    /// Box samples; zero skips the box search
    pub samples: usize,
    pub seed: u64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            confidence: 0.95,
            max_error: None,
            initial_step: 0.5,
            tolerance: 1e-7,
            max_iterations: 100,
            box_multiplier: 1.5,
            samples: 10_000,
            seed: 42,
        }
    }
}

impl ComparisonConfig {
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    /// Set the number of box samples
    ///
    /// # Arguments
    ///
    /// * `samples` - Points drawn for the box search, `0` to skip it
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Error ceiling for a model sitting at its optimum.
    pub fn ceiling<M: ModelAdapter>(&self, model: &M, metric: ErrorMetric) -> Result<f64> {
        match self.max_error {
            Some(max_error) => Ok(max_error),
            None => fisher::model_threshold(model, metric, self.confidence),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(EqFitError::InvalidConfig(format!(
                "confidence level must lie in (0, 1), got {}",
                self.confidence
            )));
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(EqFitError::InvalidConfig(format!(
                "initial step must be positive, got {}",
                self.initial_step
            )));
        }
        if !(self.tolerance > 0.0 && self.box_multiplier > 0.0) || self.max_iterations == 0 {
            return Err(EqFitError::InvalidConfig(
                "tolerance, box multiplier and max_iterations must be positive".to_string(),
            ));
        }
        if let Some(max_error) = self.max_error {
            if !(max_error.is_finite() && max_error > 0.0) {
                return Err(EqFitError::InvalidConfig(format!(
                    "max_error must be positive, got {}",
                    max_error
                )));
            }
        }
        Ok(())
    }
}

/// Interval of one parameter with the others held at the optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub name: String,
    pub index: usize,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    /// Both directions met the ceiling within tolerance
    pub converged: bool,
}

/// Range of one parameter over the accepted box samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub index: usize,
    pub min: f64,
    pub max: f64,
}

/// Outcome of the random box search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSearch {
    pub samples: usize,
    pub accepted: usize,
    /// Volume of the sampled box
    pub box_volume: f64,
    /// `box_volume · accepted / samples`
    pub region_volume: f64,
    /// Empty when no sample was accepted
    pub ranges: Vec<ParameterRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub optimum_error: f64,
    pub max_error: f64,
    pub intervals: Vec<ConfidenceInterval>,
    pub box_search: Option<BoxSearch>,
    pub interrupted: bool,
}

/// Push parameter `index` away from its current value until the error meets
/// `max_error`.
///
/// Steps of `initial_step` are taken until the ceiling is passed; the last
/// bracket is then bisected. Returns the boundary and whether it met the
/// ceiling within tolerance. The model is restored afterwards.
///
/// # Arguments
///
/// * `model` - Model at its optimum
/// * `index` - Parameter to move
/// * `direction` - `1.0` for the upper limit, `-1.0` for the lower one
/// * `max_error` - Error ceiling
/// * `metric` - Error metric of the fit
/// * `config` - Step, tolerance and iteration cap
pub fn single_limit<M: ModelAdapter>(
    model: &mut M,
    index: usize,
    direction: f64,
    max_error: f64,
    metric: ErrorMetric,
    config: &ComparisonConfig,
) -> Result<(f64, bool)> {
    let state = model.export_state();
    let mut inside = model.parameter(index);
    let mut outside: Option<f64> = None;
    let mut limit = None;

    for _ in 0..config.max_iterations {
        let trial = match outside {
            None => inside + direction * config.initial_step,
            Some(out) => 0.5 * (inside + out),
        };
        model.set_parameter(index, trial)?;
        model.recalculate();
        let error = model.error(metric);

        if error.is_finite() && (error - max_error).abs() <= config.tolerance * max_error {
            limit = Some(trial);
            break;
        }
        if error.is_finite() && error < max_error {
            inside = trial;
        } else {
            outside = Some(trial);
        }
        if let Some(out) = outside {
            if (out - inside).abs() <= f64::EPSILON * inside.abs().max(1.0) {
                limit = Some(inside);
                break;
            }
        }
    }

    model.import_state(&state)?;
    model.clear_corrupt();
    Ok(match limit {
        Some(value) => (value, true),
        None => (inside, false),
    })
}

/// Lower and upper limit of one parameter.
pub fn fast_confidence<M: ModelAdapter>(
    model: &mut M,
    index: usize,
    max_error: f64,
    metric: ErrorMetric,
    config: &ComparisonConfig,
) -> Result<ConfidenceInterval> {
    let n = model.parameter_count();
    if index >= n {
        return Err(EqFitError::InvalidParameter(format!(
            "parameter index {} out of range for {} parameters",
            index, n
        )));
    }
    let (upper, upper_ok) = single_limit(model, index, 1.0, max_error, metric, config)?;
    let (lower, lower_ok) = single_limit(model, index, -1.0, max_error, metric, config)?;
    debug!(
        "{}: [{}, {}] at ceiling {:e}",
        model.parameter_name(index),
        lower,
        upper,
        max_error
    );
    Ok(ConfidenceInterval {
        name: model.parameter_name(index),
        index,
        value: model.parameter(index),
        lower,
        upper,
        converged: upper_ok && lower_ok,
    })
}

/// Sampling box around `intervals`, one `(low, high)` pair per interval.
pub fn make_box(intervals: &[ConfidenceInterval], multiplier: f64) -> Vec<(f64, f64)> {
    intervals
        .iter()
        .map(|c| {
            (
                c.value - multiplier * (c.value - c.lower),
                c.value + multiplier * (c.upper - c.value),
            )
        })
        .collect()
}

/// Uniform points inside `bounds`, drawn from one seeded generator.
pub fn box_samples(bounds: &[(f64, f64)], samples: usize, seed: u64) -> Vec<Array1<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..samples)
        .map(|_| {
            bounds
                .iter()
                .map(|&(low, high)| low + (high - low) * rng.gen::<f64>())
                .collect()
        })
        .collect()
}

/// Error with the parameters at `indices` moved to `point`.
///
/// The other parameters keep their current values and the model is restored
/// afterwards.
pub fn sample_error<M: ModelAdapter>(
    model: &mut M,
    indices: &[usize],
    point: &Array1<f64>,
    metric: ErrorMetric,
) -> Result<f64> {
    let state = model.export_state();
    for (&index, &value) in indices.iter().zip(point.iter()) {
        model.set_parameter(index, value)?;
    }
    model.recalculate();
    let error = model.error(metric);
    model.import_state(&state)?;
    model.clear_corrupt();
    Ok(error)
}

/// Ranges of the samples whose error stays within `max_error`.
///
/// `errors[k]` belongs to `points[k]`; a `None` error marks a sample skipped
/// by an interrupt.
pub fn summarize_box<M: ModelAdapter>(
    model: &M,
    indices: &[usize],
    bounds: &[(f64, f64)],
    points: &[Array1<f64>],
    errors: &[Option<f64>],
    max_error: f64,
) -> BoxSearch {
    let evaluated = errors.iter().flatten().count();
    let accepted: Vec<&Array1<f64>> = points
        .iter()
        .zip(errors)
        .filter(|(_, e)| matches!(e, Some(e) if *e <= max_error))
        .map(|(p, _)| p)
        .collect();

    let ranges = if accepted.is_empty() {
        Vec::new()
    } else {
        indices
            .iter()
            .enumerate()
            .map(|(k, &index)| {
                let (min, max) = accepted.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, p| {
                    (acc.0.min(p[k]), acc.1.max(p[k]))
                });
                ParameterRange {
                    name: model.parameter_name(index),
                    index,
                    min,
                    max,
                }
            })
            .collect()
    };

    let box_volume: f64 = bounds.iter().map(|(low, high)| high - low).product();
    let region_volume = if evaluated == 0 {
        0.0
    } else {
        box_volume * accepted.len() as f64 / evaluated as f64
    };
    BoxSearch {
        samples: evaluated,
        accepted: accepted.len(),
        box_volume,
        region_volume,
        ranges,
    }
}

//! One-dimensional confidence profiles.
//!
//! A profile walks one parameter away from its optimum in fixed increments,
//! re-fits every other free parameter at each step and integrates the
//! resulting error curve. The walk in each direction ends where the error
//! exceeds the threshold; that value is the confidence boundary. The threshold
//! is `error_ratio_limit · E*` unless an absolute ceiling or an F-test
//! confidence level is configured.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{ErrorMetric, OptimizerConfig};
use crate::error::{EqFitError, Result};
use crate::interrupt::Interrupt;
use crate::minimizer::Minimizer;
use crate::model::ModelAdapter;

use super::fisher;

/// Settings of a confidence sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Step of the swept parameter
    pub increment: f64,
    /// Steps per direction
    pub max_steps: usize,
    /// A direction ends once `E / E*` exceeds this
    pub error_ratio_limit: f64,
    /// Steps with `E* < E ≤ band·E*` contribute to `integ_1`
    pub integration_band: f64,
    /// A direction is abandoned once more steps than this beat `E*`
    pub improvement_limit: usize,
    /// Re-fit the other parameters at every step
    pub relax: bool,
    /// Absolute error ceiling replacing `error_ratio_limit · E*`
    pub max_error: Option<f64>,
    /// F-test confidence level in `(0, 1)`; derives the ceiling from the
    /// fit when `max_error` is unset
    pub confidence: Option<f64>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self::from(&OptimizerConfig::default())
    }
}

impl From<&OptimizerConfig> for ProfileConfig {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            increment: config.increment,
            max_steps: config.max_steps,
            error_ratio_limit: 1.025,
            integration_band: 1.005,
            improvement_limit: 50,
            relax: true,
            max_error: None,
            confidence: None,
        }
    }
}

impl ProfileConfig {
    /// Set the step of the swept parameter
    ///
    /// # Arguments
    ///
    /// * `increment` - Positive step, in the parameter's own units
    pub fn with_increment(mut self, increment: f64) -> Self {
        self.increment = increment;
        self
    }

    /// Set how many steps each direction may take before giving up
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Choose between a profile (`true`, the other parameters are re-fitted
    /// at every step) and a plain grid search (`false`)
    pub fn with_relax(mut self, relax: bool) -> Self {
        self.relax = relax;
        self
    }

    /// Set how many improving steps a direction tolerates
    ///
    /// # Arguments
    ///
    /// * `limit` - A direction stops, not converged, once more steps than
    ///   this beat the optimum's error
    pub fn with_improvement_limit(mut self, limit: usize) -> Self {
        self.improvement_limit = limit;
        self
    }

    /// Set an absolute error ceiling
    ///
    /// # Arguments
    ///
    /// * `max_error` - Ceiling in the units of the error metric; takes
    ///   precedence over `confidence` and `error_ratio_limit`
    pub fn with_max_error(mut self, max_error: f64) -> Self {
        self.max_error = Some(max_error);
        self
    }

    /// Derive the ceiling from an F-test
    ///
    /// # Arguments
    ///
    /// * `confidence` - Level in `(0, 1)`, e.g. `0.95`; the ceiling is
    ///   `E*·(1 + F·p/(n - p))` for the model being profiled
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Error ceiling for a model at its optimum with error `e_star`.
    pub fn threshold<M: ModelAdapter>(&self, model: &M, metric: ErrorMetric, e_star: f64) -> Result<f64> {
        match (self.max_error, self.confidence) {
            (Some(max_error), _) => Ok(max_error),
            (None, Some(confidence)) => fisher::model_threshold(model, metric, confidence),
            (None, None) => Ok(self.error_ratio_limit * e_star),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.increment.is_finite() && self.increment > 0.0) {
            return Err(EqFitError::InvalidConfig(format!(
                "increment must be positive, got {}",
                self.increment
            )));
        }
        if self.max_steps == 0 {
            return Err(EqFitError::InvalidConfig(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if !(self.error_ratio_limit > 1.0 && self.integration_band >= 1.0) {
            return Err(EqFitError::InvalidConfig(format!(
                "error ratio limit {} and integration band {} must exceed 1",
                self.error_ratio_limit, self.integration_band
            )));
        }
        if let Some(confidence) = self.confidence {
            if !(confidence > 0.0 && confidence < 1.0) {
                return Err(EqFitError::InvalidConfig(format!(
                    "confidence level must lie in (0, 1), got {}",
                    confidence
                )));
            }
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

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    pub value: f64,
    pub error: f64,
}

/// Profile of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceProfile {
    pub name: String,
    pub index: usize,
    /// Parameter value at the optimum
    pub optimum: f64,
    /// `E*`
    pub optimum_error: f64,
    /// Error ceiling that ended each direction
    pub threshold: f64,
    /// Lower boundary
    pub min: f64,
    /// Upper boundary
    pub max: f64,
    pub integ_5: f64,
    pub integ_1: f64,
    pub converged: bool,
    pub interrupted: bool,
    /// Visited points ordered by value, optimum included
    pub points: Vec<ProfilePoint>,
}

impl ConfidenceProfile {
    /// How often the profile crosses `ratio · E*`.
    ///
    /// A well-behaved profile crosses twice, once per boundary.
    pub fn crossings(&self, ratio: f64) -> usize {
        count_threshold_crossings(&self.points, ratio * self.optimum_error)
    }
}

/// Number of neighbouring point pairs on opposite sides of `threshold`.
pub fn count_threshold_crossings(points: &[ProfilePoint], threshold: f64) -> usize {
    points
        .windows(2)
        .filter(|pair| (pair[0].error > threshold) != (pair[1].error > threshold))
        .count()
}

struct Direction {
    points: Vec<ProfilePoint>,
    boundary: f64,
    converged: bool,
    interrupted: bool,
}

/// Confidence sweep over one parameter of a model.
#[derive(Debug, Clone)]
pub struct ProfileSweep {
    config: ProfileConfig,
    minimizer: Minimizer,
    interrupt: Option<Interrupt>,
}

impl ProfileSweep {
    pub fn new(config: ProfileConfig, optimizer: &OptimizerConfig) -> Self {
        Self {
            config,
            minimizer: Minimizer::new(optimizer.clone()),
            interrupt: None,
        }
    }

    /// Poll `interrupt` once per step.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().map_or(false, Interrupt::is_triggered)
    }

    /// Profile parameter `index` of a model sitting at its optimum.
    ///
    /// The model is left at the optimum afterwards.
    pub fn run<M: ModelAdapter>(&mut self, model: &mut M, index: usize) -> Result<ConfidenceProfile> {
        self.config.validate()?;
        let n = model.parameter_count();
        if index >= n {
            return Err(EqFitError::InvalidParameter(format!(
                "parameter index {} out of range for {} parameters",
                index, n
            )));
        }

        let metric = self.minimizer.config().error_metric;
        let optimum_state = model.export_state();
        model.recalculate();
        let e_star = model.error(metric);
        let optimum = model.parameter(index);
        let name = model.parameter_name(index);
        let threshold = self.config.threshold(model, metric, e_star)?;
        debug!(
            "profiling {} from {} (E* = {:e}, threshold {:e})",
            name, optimum, e_star, threshold
        );

        let upper = self.walk(model, index, optimum, e_star, threshold, self.config.increment)?;
        model.import_state(&optimum_state)?;
        let lower = if upper.interrupted {
            Direction {
                points: Vec::new(),
                boundary: optimum,
                converged: false,
                interrupted: true,
            }
        } else {
            self.walk(model, index, optimum, e_star, threshold, -self.config.increment)?
        };
        model.import_state(&optimum_state)?;

        let mut integ_5 = 0.0;
        let mut integ_1 = 0.0;
        for direction in [&upper, &lower] {
            let (i5, i1) = integrate(&direction.points, optimum, e_star, self.config.integration_band);
            integ_5 += i5;
            integ_1 += i1;
        }
        let scale = e_star.max(f64::MIN_POSITIVE);

        let mut points: Vec<ProfilePoint> = lower.points.into_iter().rev().collect();
        points.push(ProfilePoint {
            value: optimum,
            error: e_star,
        });
        points.extend(upper.points);

        Ok(ConfidenceProfile {
            name,
            index,
            optimum,
            optimum_error: e_star,
            threshold,
            min: lower.boundary,
            max: upper.boundary,
            integ_5: integ_5 / scale,
            integ_1: integ_1 / scale,
            converged: upper.converged && lower.converged,
            interrupted: upper.interrupted || lower.interrupted,
            points,
        })
    }

    fn walk<M: ModelAdapter>(
        &mut self,
        model: &mut M,
        index: usize,
        optimum: f64,
        e_star: f64,
        threshold: f64,
        increment: f64,
    ) -> Result<Direction> {
        let metric = self.minimizer.config().error_metric;
        let mut locked = vec![false; model.parameter_count()];
        locked[index] = true;

        let mut direction = Direction {
            points: Vec::new(),
            boundary: optimum,
            converged: false,
            interrupted: false,
        };
        let mut improvements = 0;

        for m in 1..=self.config.max_steps {
            if self.interrupted() {
                direction.interrupted = true;
                return Ok(direction);
            }

            let value = optimum + m as f64 * increment;
            model.set_parameter(index, value)?;
            let error = if self.config.relax {
                self.minimizer.minimize(model, &locked)?.error
            } else {
                model.recalculate();
                model.error(metric)
            };

            direction.boundary = value;
            direction.points.push(ProfilePoint { value, error });

            if !error.is_finite() {
                warn!("profile of parameter {} hit a non-finite error at {}", index, value);
                return Ok(direction);
            }
            if error < e_star {
                improvements += 1;
            }
            if error > threshold {
                direction.converged = true;
                return Ok(direction);
            }
            if improvements > self.config.improvement_limit {
                warn!(
                    "profile of parameter {} found {} better points; the fit is not at a minimum",
                    index, improvements
                );
                return Ok(direction);
            }
        }

        debug!(
            "profile of parameter {} exhausted {} steps",
            index, self.config.max_steps
        );
        Ok(direction)
    }
}

/// Trapezoidal area under one direction, starting at the optimum.
///
/// Returns `(integ_5, integ_1)` before normalization; `integ_1` only collects
/// steps whose error lies in `(E*, band·E*]`.
fn integrate(points: &[ProfilePoint], optimum: f64, e_star: f64, band: f64) -> (f64, f64) {
    let mut previous = ProfilePoint {
        value: optimum,
        error: e_star,
    };
    let mut integ_5 = 0.0;
    let mut integ_1 = 0.0;
    for point in points.iter().filter(|p| p.error.is_finite()) {
        let width = (point.value - previous.value).abs();
        let area = point.error.min(previous.error) * width
            + 0.5 * width * (point.error - previous.error).abs();
        integ_5 += area;
        if point.error > e_star && point.error <= band * e_star {
            integ_1 += area;
        }
        previous = *point;
    }
    (integ_5, integ_1)
}

//! Fit engine: drives the Levenberg-Marquardt loop over a [`ModelAdapter`].
//!
//! The minimizer turns the free parameters of a model into a least-squares
//! [`Problem`], runs the optimizer and writes the best parameters it ever saw
//! back into the model. Damping trouble and unphysical model states are
//! reported on the returned [`FitOutcome`] rather than as errors.

use log::{debug, warn};
use ndarray::Array1;
use std::cell::{Cell, RefCell};
use std::fmt;

use crate::config::{ErrorMetric, OptimizerConfig};
use crate::error::{EqFitError, Result};
use crate::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use crate::model::ModelAdapter;
use crate::problem::Problem;

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// A gradient, step or residual tolerance was met.
    Converged,
    /// The iteration budget ran out; parameters are the best seen.
    MaxIterationsReached,
    /// Non-finite start or damping overflow; parameters were restored.
    Failed,
}

impl From<ConvergenceStatus> for FitStatus {
    fn from(status: ConvergenceStatus) -> Self {
        match status {
            s if s.is_converged() => FitStatus::Converged,
            ConvergenceStatus::MaxIterationsReached => FitStatus::MaxIterationsReached,
            _ => FitStatus::Failed,
        }
    }
}

/// Lifecycle of a [`Minimizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinimizerState {
    #[default]
    Idle,
    Running,
    Converged,
    MaxIterationsReached,
    Failed,
}

impl From<FitStatus> for MinimizerState {
    fn from(status: FitStatus) -> Self {
        match status {
            FitStatus::Converged => MinimizerState::Converged,
            FitStatus::MaxIterationsReached => MinimizerState::MaxIterationsReached,
            FitStatus::Failed => MinimizerState::Failed,
        }
    }
}

/// Result of one call to [`Minimizer::minimize`].
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub status: FitStatus,
    /// Full parameter vector left in the model, locked entries included
    pub parameters: Array1<f64>,
    /// Objective under the configured metric at `parameters`
    pub error: f64,
    pub iterations: usize,
    /// Model recalculations, finite-difference steps included
    pub evaluations: usize,
    /// Whether any recalculation during the fit was unphysical
    pub corrupt: bool,
    /// Datapoints whose concentration solve missed its tolerance at
    /// `parameters`
    pub unconverged_points: usize,
}

impl FitOutcome {
    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }
}

impl fmt::Display for FitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fit Outcome:")?;
        writeln!(f, "  Status: {:?}", self.status)?;
        writeln!(f, "  Error: {:.6e}", self.error)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Evaluations: {}", self.evaluations)?;
        writeln!(f, "  Corrupt: {}", self.corrupt)?;
        writeln!(f, "  Unconverged points: {}", self.unconverged_points)?;
        writeln!(f, "  Parameters: {:?}", self.parameters)?;
        Ok(())
    }
}

/// Least-squares view of a model restricted to its free parameters.
struct ModelProblem<'a, M: ModelAdapter> {
    model: RefCell<&'a mut M>,
    free: Vec<usize>,
    metric: ErrorMetric,
    residual_count: usize,
    best: RefCell<Option<(f64, Array1<f64>)>>,
    evaluations: Cell<usize>,
}

impl<'a, M: ModelAdapter> ModelProblem<'a, M> {
    fn new(model: &'a mut M, free: Vec<usize>, metric: ErrorMetric) -> Self {
        let residual_count = model.residuals().len();
        Self {
            model: RefCell::new(model),
            free,
            metric,
            residual_count,
            best: RefCell::new(None),
            evaluations: Cell::new(0),
        }
    }

    /// Best `(error, full state)` seen and the evaluation count.
    fn finish(self) -> (Option<(f64, Array1<f64>)>, usize) {
        (self.best.into_inner(), self.evaluations.get())
    }
}

impl<'a, M: ModelAdapter> Problem for ModelProblem<'a, M> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.evaluations.set(self.evaluations.get() + 1);
        if params.iter().any(|p| !p.is_finite()) {
            return Ok(Array1::from_elem(self.residual_count, f64::NAN));
        }

        let mut model = self.model.borrow_mut();
        for (&index, &value) in self.free.iter().zip(params.iter()) {
            model.set_parameter(index, value)?;
        }
        model.recalculate();
        let residuals = model.residuals();
        if residuals.len() != self.residual_count {
            return Err(EqFitError::DimensionMismatch(format!(
                "model produced {} residuals, expected {}",
                residuals.len(),
                self.residual_count
            )));
        }

        let error = self.metric.evaluate(&residuals);
        if error.is_finite() {
            let mut best = self.best.borrow_mut();
            if best.as_ref().map_or(true, |(lowest, _)| error < *lowest) {
                *best = Some((error, model.export_state()));
            }
        }
        Ok(self.metric.transform(residuals))
    }

    fn parameter_count(&self) -> usize {
        self.free.len()
    }

    fn residual_count(&self) -> usize {
        self.residual_count
    }
}

/// Levenberg-Marquardt fit engine for [`ModelAdapter`]s.
#[derive(Debug, Clone, Default)]
pub struct Minimizer {
    config: OptimizerConfig,
    state: MinimizerState,
}

impl Minimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            state: MinimizerState::Idle,
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// State after the most recent call to [`minimize`](Self::minimize).
    pub fn state(&self) -> MinimizerState {
        self.state
    }

    /// Fit the model in place.
    ///
    /// # Arguments
    ///
    /// * `model` - The model to fit; left at the best parameters seen
    /// * `locked` - Extra locks on top of the model's own, one flag per
    ///   parameter, or empty for none
    ///
    /// # Returns
    ///
    /// * The outcome, or an error if `locked` has the wrong length or the
    ///   model rejects a parameter write
    pub fn minimize<M: ModelAdapter>(&mut self, model: &mut M, locked: &[bool]) -> Result<FitOutcome> {
        let n = model.parameter_count();
        if !locked.is_empty() && locked.len() != n {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected {} lock flags, got {}",
                n,
                locked.len()
            )));
        }

        self.state = MinimizerState::Running;
        model.clear_corrupt();
        let snapshot = model.export_state();
        let metric = self.config.error_metric;
        let free: Vec<usize> = (0..n)
            .filter(|&i| !model.is_locked(i) && !locked.get(i).copied().unwrap_or(false))
            .collect();

        if free.is_empty() {
            model.recalculate();
            self.state = MinimizerState::Converged;
            return Ok(FitOutcome {
                status: FitStatus::Converged,
                parameters: snapshot,
                error: model.error(metric),
                iterations: 0,
                evaluations: 1,
                corrupt: model.is_corrupt(),
                unconverged_points: model.unconverged_points(),
            });
        }

        let initial: Array1<f64> = free.iter().map(|&i| model.parameter(i)).collect();
        let optimizer = LevenbergMarquardt::with_config(LmConfig::from(&self.config));
        let problem = ModelProblem::new(model, free, metric);
        let result = optimizer.minimize(&problem, initial);
        let (best, evaluations) = problem.finish();

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                self.state = MinimizerState::Failed;
                model.import_state(&snapshot)?;
                return Err(err);
            }
        };

        let status = FitStatus::from(result.status);
        let parameters = match (status, best) {
            (FitStatus::Failed, _) | (_, None) => {
                warn!("fit failed: {}", result.message);
                snapshot
            }
            (_, Some((_, state))) => state,
        };
        model.import_state(&parameters)?;
        let status = if status != FitStatus::Failed && !model.error(metric).is_finite() {
            FitStatus::Failed
        } else {
            status
        };

        let unconverged_points = model.unconverged_points();
        if unconverged_points > 0 {
            warn!(
                "{} datapoints did not reach the concentration tolerance at the fitted parameters",
                unconverged_points
            );
        }
        debug!(
            "fit finished after {} iterations and {} evaluations: {:?}",
            result.iterations, evaluations, status
        );
        self.state = MinimizerState::from(status);
        Ok(FitOutcome {
            status,
            error: model.error(metric),
            parameters,
            iterations: result.iterations,
            evaluations,
            corrupt: model.is_corrupt(),
            unconverged_points,
        })
    }
}

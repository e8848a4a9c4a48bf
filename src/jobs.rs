//! Job orchestration on a bounded worker pool.
//!
//! A [`JobManager`] owns one rayon pool sized from
//! [`OptimizerConfig::thread_count`]. Confidence profiles and model
//! comparison run one parameter per job, Monte Carlo one trial per job and
//! cross-validation or reduction one data subset per job. Every job works on
//! its own clone of the reference model and results come back in submission
//! order. The calling thread blocks until the pool is done.

use log::info;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::config::OptimizerConfig;
use crate::error::{EqFitError, Result};
use crate::interrupt::Interrupt;
use crate::minimizer::FitOutcome;
use crate::model::{ModelAdapter, ResampleAdapter, SubsetAdapter};
use crate::statistics::comparison::{
    self, ComparisonConfig, ComparisonResult, ConfidenceInterval,
};
use crate::statistics::monte_carlo::{self, MonteCarloConfig, MonteCarloResult};
use crate::statistics::profile::{ConfidenceProfile, ProfileConfig, ProfileSweep};
use crate::statistics::resample::{
    self, CrossValidationConfig, ReductionConfig, ResampleResult, SubsetFit,
};

/// Box samples evaluated per job.
const BOX_CHUNK: usize = 500;

/// Which parameters a confidence job profiles.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParameterSelection {
    /// Unlocked stability constants
    #[default]
    Globals,
    /// Every unlocked parameter
    All,
    /// Explicit positions
    Indices(Vec<usize>),
}

impl ParameterSelection {
    fn resolve<M: ModelAdapter>(&self, model: &M) -> Result<Vec<usize>> {
        let n = model.parameter_count();
        match self {
            ParameterSelection::Globals => Ok((0..n)
                .filter(|&i| model.is_global(i) && !model.is_locked(i))
                .collect()),
            ParameterSelection::All => Ok((0..n).filter(|&i| !model.is_locked(i)).collect()),
            ParameterSelection::Indices(indices) => {
                if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
                    return Err(EqFitError::InvalidParameter(format!(
                        "parameter index {} out of range for {} parameters",
                        bad, n
                    )));
                }
                Ok(indices.clone())
            }
        }
    }
}

/// Profiles of one confidence job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub profiles: Vec<ConfidenceProfile>,
    /// Every profile converged
    pub converged: bool,
    /// Some profile was cut short by the interrupt
    pub interrupted: bool,
}

impl ConfidenceReport {
    fn from_profiles(profiles: Vec<ConfidenceProfile>) -> Self {
        Self {
            converged: profiles.iter().all(|p| p.converged),
            interrupted: profiles.iter().any(|p| p.interrupted),
            profiles,
        }
    }
}

/// An analysis queued on a [`JobManager`].
#[derive(Debug, Clone)]
pub enum Job {
    Confidence {
        selection: ParameterSelection,
        config: ProfileConfig,
    },
    MonteCarlo(MonteCarloConfig),
    ModelComparison {
        selection: ParameterSelection,
        config: ComparisonConfig,
    },
    CrossValidation(CrossValidationConfig),
    Reduction(ReductionConfig),
}

#[derive(Debug, Clone)]
pub enum JobResult {
    Confidence(ConfidenceReport),
    MonteCarlo(MonteCarloResult),
    ModelComparison(ComparisonResult),
    CrossValidation(ResampleResult),
    Reduction(ResampleResult),
}

/// Runs analyses on a fixed-size thread pool.
pub struct JobManager {
    pool: ThreadPool,
    config: OptimizerConfig,
    interrupt: Interrupt,
}

impl std::fmt::Debug for JobManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobManager")
            .field("threads", &self.pool.current_num_threads())
            .field("config", &self.config)
            .finish()
    }
}

impl JobManager {
    /// Build the pool. Fails on an invalid configuration or if the pool
    /// cannot be created.
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.thread_count)
            .thread_name(|i| format!("eqfit-worker-{}", i))
            .build()
            .map_err(|e| EqFitError::ThreadPool(e.to_string()))?;
        Ok(Self {
            pool,
            config,
            interrupt: Interrupt::new(),
        })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Handle for cancelling running jobs from another thread.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Run `job(0..count)` and return the results by index.
    ///
    /// With `parallel = false` the jobs run on the calling thread.
    pub fn run_indexed<T, F>(&self, count: usize, parallel: bool, job: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        if parallel {
            self.pool
                .install(|| (0..count).into_par_iter().map(&job).collect())
        } else {
            (0..count).map(job).collect()
        }
    }

    /// Confidence profiles for the selected parameters of a fitted model.
    pub fn confidence<M: ModelAdapter>(
        &self,
        model: &M,
        selection: &ParameterSelection,
        config: &ProfileConfig,
    ) -> Result<ConfidenceReport> {
        config.validate()?;
        let indices = selection.resolve(model)?;
        let parallel = model.supports_parallel_evaluation();
        info!(
            "confidence: profiling {} parameters on {} threads",
            indices.len(),
            if parallel { self.thread_count() } else { 1 }
        );

        let profiles = self
            .run_indexed(indices.len(), parallel, |i| {
                let mut worker = model.clone();
                ProfileSweep::new(config.clone(), &self.config)
                    .with_interrupt(self.interrupt.clone())
                    .run(&mut worker, indices[i])
            })
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let report = ConfidenceReport::from_profiles(profiles);
        info!(
            "confidence: done, converged = {}, interrupted = {}",
            report.converged, report.interrupted
        );
        Ok(report)
    }

    /// Monte Carlo resampling of a fitted model.
    pub fn monte_carlo<M: ResampleAdapter>(
        &self,
        model: &M,
        config: &MonteCarloConfig,
    ) -> Result<MonteCarloResult> {
        let (sigma, datasets) = monte_carlo::synthetic_datasets(model, config)?;
        info!(
            "monte carlo: {} trials with sigma = {:e}",
            datasets.len(),
            sigma
        );

        let outcomes = self
            .run_indexed(
                datasets.len(),
                model.supports_parallel_evaluation(),
                |i| -> Result<Option<FitOutcome>> {
                    if self.interrupt.is_triggered() {
                        return Ok(None);
                    }
                    monte_carlo::run_trial(model, &datasets[i], &self.config).map(Some)
                },
            )
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let result = monte_carlo::summarize(model, config, sigma, &outcomes);
        info!(
            "monte carlo: {} trials completed, {} converged",
            result.completed, result.converged
        );
        Ok(result)
    }

    /// Fixed-parameter confidence intervals of the selected parameters and,
    /// unless `config.samples` is zero, a random box search around them.
    pub fn model_comparison<M: ModelAdapter>(
        &self,
        model: &M,
        selection: &ParameterSelection,
        config: &ComparisonConfig,
    ) -> Result<ComparisonResult> {
        config.validate()?;
        let indices = selection.resolve(model)?;
        let metric = self.config.error_metric;
        let parallel = model.supports_parallel_evaluation();
        let optimum_error = model.error(metric);
        let max_error = config.ceiling(model, metric)?;
        info!(
            "model comparison: {} parameters, ceiling {:e} over E* = {:e}",
            indices.len(),
            max_error,
            optimum_error
        );

        let intervals = self
            .run_indexed(
                indices.len(),
                parallel,
                |i| -> Result<Option<ConfidenceInterval>> {
                    if self.interrupt.is_triggered() {
                        return Ok(None);
                    }
                    let mut worker = model.clone();
                    comparison::fast_confidence(&mut worker, indices[i], max_error, metric, config)
                        .map(Some)
                },
            )
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        let mut interrupted = intervals.iter().any(Option::is_none);
        let intervals: Vec<ConfidenceInterval> = intervals.into_iter().flatten().collect();

        let box_search = if config.samples > 0 && !interrupted && !intervals.is_empty() {
            let bounds = comparison::make_box(&intervals, config.box_multiplier);
            let points = comparison::box_samples(&bounds, config.samples, config.seed);
            let chunks = points.len().div_ceil(BOX_CHUNK);
            let errors: Vec<Option<f64>> = self
                .run_indexed(chunks, parallel, |c| -> Result<Vec<Option<f64>>> {
                    let chunk = &points[c * BOX_CHUNK..((c + 1) * BOX_CHUNK).min(points.len())];
                    if self.interrupt.is_triggered() {
                        return Ok(vec![None; chunk.len()]);
                    }
                    let mut worker = model.clone();
                    chunk
                        .iter()
                        .map(|p| comparison::sample_error(&mut worker, &indices, p, metric).map(Some))
                        .collect()
                })
                .into_iter()
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .collect();
            interrupted |= errors.iter().any(Option::is_none);
            Some(comparison::summarize_box(
                model, &indices, &bounds, &points, &errors, max_error,
            ))
        } else {
            None
        };

        info!("model comparison: done, interrupted = {}", interrupted);
        Ok(ComparisonResult {
            optimum_error,
            max_error,
            intervals,
            box_search,
            interrupted,
        })
    }

    /// Refit with one, two or `x` datapoints left out at a time.
    pub fn cross_validation<M: SubsetAdapter>(
        &self,
        model: &M,
        config: &CrossValidationConfig,
    ) -> Result<ResampleResult> {
        let sets = resample::leave_out_sets(model.point_count(), config)?;
        info!("cross validation: {} subsets", sets.len());
        self.resample(model, &sets, config.error_percent, config.histogram_bins)
    }

    /// Refit with datapoints dropped cumulatively from one end.
    pub fn reduction<M: SubsetAdapter>(
        &self,
        model: &M,
        config: &ReductionConfig,
    ) -> Result<ResampleResult> {
        let sets = resample::reduction_sets(model.point_count(), config)?;
        info!("reduction: {} subsets", sets.len());
        self.resample(model, &sets, config.error_percent, config.histogram_bins)
    }

    fn resample<M: SubsetAdapter>(
        &self,
        model: &M,
        sets: &[Vec<usize>],
        error_percent: f64,
        bins: usize,
    ) -> Result<ResampleResult> {
        let refits = self
            .run_indexed(
                sets.len(),
                model.supports_parallel_evaluation(),
                |i| -> Result<Option<(SubsetFit, FitOutcome)>> {
                    if self.interrupt.is_triggered() {
                        return Ok(None);
                    }
                    resample::refit_subset(model, &sets[i], &self.config).map(Some)
                },
            )
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let result = resample::summarize(model, refits, error_percent, bins);
        info!(
            "resampling: {} subsets refitted, {} converged",
            result.fits.len(),
            result.converged
        );
        Ok(result)
    }

    /// Run a queue of analyses against one model, in order.
    pub fn run_jobs<M>(&self, model: &M, jobs: &[Job]) -> Result<Vec<JobResult>>
    where
        M: ResampleAdapter + SubsetAdapter,
    {
        jobs.iter()
            .map(|job| match job {
                Job::Confidence { selection, config } => self
                    .confidence(model, selection, config)
                    .map(JobResult::Confidence),
                Job::MonteCarlo(config) => {
                    self.monte_carlo(model, config).map(JobResult::MonteCarlo)
                }
                Job::ModelComparison { selection, config } => self
                    .model_comparison(model, selection, config)
                    .map(JobResult::ModelComparison),
                Job::CrossValidation(config) => self
                    .cross_validation(model, config)
                    .map(JobResult::CrossValidation),
                Job::Reduction(config) => self.reduction(model, config).map(JobResult::Reduction),
            })
            .collect()
    }
}

//! Statistical post-analysis of fitted models.
//!
//! - [`profile`]: one-dimensional confidence profiles
//! - [`comparison`]: fixed-parameter confidence intervals and box search
//! - [`monte_carlo`]: resampling with synthetic noise
//! - [`resample`]: cross-validation and reduction on data subsets
//! - [`fisher`]: F-test error thresholds
//! - [`summary`]: moments, percentile bars and histograms

pub mod comparison;
pub mod fisher;
pub mod monte_carlo;
pub mod profile;
pub mod resample;
pub mod summary;

pub use comparison::{BoxSearch, ComparisonConfig, ComparisonResult, ConfidenceInterval};
pub use fisher::{f_quantile, f_test_threshold};
pub use monte_carlo::{MonteCarloConfig, MonteCarloResult};
pub use profile::{
    count_threshold_crossings, ConfidenceProfile, ProfileConfig, ProfilePoint, ProfileSweep,
};
pub use resample::{
    CrossValidationConfig, LeaveOut, ReductionConfig, ReductionDirection, ResampleResult,
    SubsetFit,
};
pub use summary::{ConfidenceBar, HistogramBin, ParameterSummary};

//! F-test error thresholds.
//!
//! A parameter value is inside the confidence region when refitting with it
//! pinned raises the error by no more than the F-test allows:
//!
//! ```text
//! E_max = E* · (1 + F(c; p, n - p) · p / (n - p))
//! ```
//!
//! with `p` free parameters, `n` residuals and confidence level `c`.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::config::ErrorMetric;
use crate::error::{EqFitError, Result};
use crate::model::ModelAdapter;

const QUANTILE_MAX_ITERATIONS: usize = 200;

/// Quantile `F(confidence; numerator, denominator)` of the F distribution.
///
/// # Arguments
///
/// * `confidence` - Probability in `(0, 1)`, e.g. `0.95`
/// * `numerator` - Degrees of freedom of the numerator (parameters)
/// * `denominator` - Degrees of freedom of the denominator (points minus parameters)
pub fn f_quantile(confidence: f64, numerator: usize, denominator: usize) -> Result<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(EqFitError::InvalidConfig(format!(
            "confidence level must lie in (0, 1), got {}",
            confidence
        )));
    }
    let dist = FisherSnedecor::new(numerator as f64, denominator as f64).map_err(|e| {
        EqFitError::InvalidInput(format!(
            "no F distribution with {} and {} degrees of freedom: {}",
            numerator, denominator, e
        ))
    })?;

    let mut lo = 0.0;
    let mut hi = 1.0;
    while dist.cdf(hi) < confidence {
        lo = hi;
        hi *= 2.0;
        if !hi.is_finite() {
            return Err(EqFitError::Other(format!(
                "F quantile at {} did not bracket",
                confidence
            )));
        }
    }
    for _ in 0..QUANTILE_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if dist.cdf(mid) < confidence {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-12 * hi {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Largest error still inside the `confidence` region around a fit with
/// error `error`.
///
/// # Arguments
///
/// * `error` - Error at the optimum, normally the sum of squares
/// * `parameters` - Number of fitted parameters
/// * `points` - Number of residuals
/// * `confidence` - Probability in `(0, 1)`
pub fn f_test_threshold(error: f64, parameters: usize, points: usize, confidence: f64) -> Result<f64> {
    if parameters == 0 || points <= parameters {
        return Err(EqFitError::InvalidInput(format!(
            "{} residuals leave no degrees of freedom for {} parameters",
            points, parameters
        )));
    }
    let freedom = points - parameters;
    let f = f_quantile(confidence, parameters, freedom)?;
    Ok(error * (1.0 + f * parameters as f64 / freedom as f64))
}

/// F-test threshold of a model sitting at its optimum, counting its free
/// parameters and residuals.
pub fn model_threshold<M: ModelAdapter>(model: &M, metric: ErrorMetric, confidence: f64) -> Result<f64> {
    let parameters = model.parameters().free_indices().len();
    let residuals = model.residuals();
    f_test_threshold(metric.evaluate(&residuals), parameters, residuals.len(), confidence)
}

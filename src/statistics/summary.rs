//! Descriptive statistics over resampled parameter values.

use serde::{Deserialize, Serialize};

use crate::minimizer::FitOutcome;
use crate::model::ModelAdapter;

/// Symmetric percentile interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBar {
    pub lower: f64,
    pub upper: f64,
}

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Center of the bin
    pub center: f64,
    pub count: usize,
}

/// Distribution of one parameter over a set of refits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub name: String,
    pub index: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    pub bar: Option<ConfidenceBar>,
    pub histogram: Vec<HistogramBin>,
    /// Refitted values, sorted ascending
    pub values: Vec<f64>,
}

/// Summaries of every free parameter of `model` over the refits in
/// `outcomes`.
///
/// # Arguments
///
/// * `model` - Reference model; supplies names and the free-parameter set
/// * `outcomes` - Refits sharing the model's parameter layout
/// * `error_percent` - Percent cut from each tail for the confidence bar
/// * `bins` - Histogram bins
pub fn parameter_summaries<M: ModelAdapter>(
    model: &M,
    outcomes: &[&FitOutcome],
    error_percent: f64,
    bins: usize,
) -> Vec<ParameterSummary> {
    model
        .parameters()
        .free_indices()
        .into_iter()
        .map(|index| {
            let raw: Vec<f64> = outcomes.iter().map(|o| o.parameters[index]).collect();
            let values = sorted(&raw);
            ParameterSummary {
                name: model.parameter_name(index),
                index,
                mean: mean(&values),
                std_dev: std_dev(&values),
                median: median(&values),
                bar: confidence_bar(&values, error_percent),
                histogram: histogram(&values, bins),
                values,
            }
        })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` in the denominator); zero for fewer
/// than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum / (values.len() - 1) as f64).sqrt()
}

/// Median of values that are already sorted ascending.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => f64::NAN,
        _ if n % 2 == 0 => 0.5 * (sorted[n / 2 - 1] + sorted[n / 2]),
        _ => sorted[n / 2],
    }
}

/// Sort ascending, NaN last.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Percentile bar cutting `error` percent off each tail of sorted values.
///
/// `error = 0` spans the whole sample; `error = 2.5` gives the central 95 %.
pub fn confidence_bar(sorted: &[f64], error: f64) -> Option<ConfidenceBar> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let error = error.clamp(0.0, 50.0);
    let lower = ((n as f64 * error / 100.0) as usize).min(n - 1);
    let upper = ((n as f64 * (1.0 - error / 100.0)) as usize).min(n - 1);
    Some(ConfidenceBar {
        lower: sorted[lower],
        upper: sorted[upper.max(lower)],
    })
}

/// Equal-width histogram over `[min, max]` of the values.
///
/// The maximum itself is counted in the last bin. Non-finite values are
/// skipped.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if bins == 0 || finite.is_empty() {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|j| HistogramBin {
            center: min + width * (j as f64 + 0.5),
            count: 0,
        })
        .collect();
    for v in finite {
        let j = (((v - min) / width).floor() as usize).min(bins - 1);
        out[j].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_moments() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0);
        assert_relative_eq!(std_dev(&values), (32.0f64 / 7.0).sqrt());
        assert_relative_eq!(median(&sorted(&values)), 4.5);
        assert_relative_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
        assert!(mean(&[]).is_nan());
        assert_eq!(std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_confidence_bar() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bar = confidence_bar(&values, 2.5).unwrap();
        assert_eq!(bar.lower, 2.0);
        assert_eq!(bar.upper, 97.0);

        let full = confidence_bar(&values, 0.0).unwrap();
        assert_eq!((full.lower, full.upper), (0.0, 99.0));
        assert!(confidence_bar(&[], 2.5).is_none());
    }

    #[test]
    fn test_histogram() {
        let values = [0.0, 0.1, 0.5, 0.9, 1.0];
        let bins = histogram(&values, 2);
        assert_eq!(bins.len(), 2);
        assert_relative_eq!(bins[0].center, 0.25);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 3);

        let flat = histogram(&[3.0, 3.0], 4);
        assert_eq!(flat.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(histogram(&values, 0).is_empty());
    }
}

mod common;

use eqfit_rs::statistics::{f_test_threshold, ComparisonConfig, ProfileConfig};
use eqfit_rs::{JobManager, ModelAdapter, OptimizerConfig, ParameterSelection};

fn manager() -> JobManager {
    JobManager::new(OptimizerConfig::default().with_thread_count(4)).unwrap()
}

#[test]
fn binding_constant_profile_crosses_once_per_side() {
    let model = common::fitted_model(4.0, Some((0.02, 3)));
    let optimum = model.parameter(0);
    let report = manager()
        .confidence(&model, &ParameterSelection::Globals, &ProfileConfig::default())
        .unwrap();

    assert_eq!(report.profiles.len(), 1);
    assert!(report.converged);
    assert!(!report.interrupted);

    let profile = &report.profiles[0];
    assert_eq!(profile.name, "lg β(1:1)");
    assert!(profile.min < optimum && optimum < profile.max);
    assert_eq!(profile.crossings(1.025), 2);
    assert!(profile.integ_5 > profile.integ_1 && profile.integ_1 > 0.0);
    for pair in profile.points.windows(2) {
        assert!(pair[0].value < pair[1].value);
    }
}

#[test]
fn sequential_and_parallel_reports_agree() {
    let model = common::fitted_model(4.0, Some((0.02, 5)));
    let config = ProfileConfig::default();
    let jobs = manager();

    let parallel = jobs
        .confidence(&model, &ParameterSelection::All, &config)
        .unwrap();
    let sequential = jobs
        .confidence(
            &model.clone().with_parallel_evaluation(false),
            &ParameterSelection::All,
            &config,
        )
        .unwrap();

    assert_eq!(parallel.profiles.len(), 3);
    assert_eq!(parallel, sequential);
}

#[test]
fn interrupt_returns_partial_report() {
    let model = common::fitted_model(4.0, Some((0.02, 7)));
    let jobs = manager();
    jobs.interrupt().trigger();

    let report = jobs
        .confidence(&model, &ParameterSelection::All, &ProfileConfig::default())
        .unwrap();
    assert!(report.interrupted);
    assert!(!report.converged);
    assert!(report.profiles.iter().all(|p| p.points.len() == 1));
}

#[test]
fn report_serializes_to_json() {
    let model = common::fitted_model(4.0, Some((0.02, 9)));
    let config = ProfileConfig::default().with_relax(false);
    let report = manager()
        .confidence(&model, &ParameterSelection::Globals, &config)
        .unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"integ_5\""));
    let back: eqfit_rs::ConfidenceReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.profiles.len(), 1);
    assert_eq!(back.converged, report.converged);
}

#[test]
fn f_test_threshold_widens_the_default_profile() {
    let model = common::fitted_model(4.0, Some((0.02, 3)));
    let jobs = manager();
    let default = jobs
        .confidence(&model, &ParameterSelection::Globals, &ProfileConfig::default())
        .unwrap();
    let tested = jobs
        .confidence(
            &model,
            &ParameterSelection::Globals,
            &ProfileConfig::default().with_confidence(0.95),
        )
        .unwrap();

    let (narrow, wide) = (&default.profiles[0], &tested.profiles[0]);
    // lg K and two shifts fitted to 11 points
    let expected = f_test_threshold(wide.optimum_error, 3, common::POINTS, 0.95).unwrap();
    assert!((wide.threshold - expected).abs() <= 1e-9 * expected);
    assert!(wide.threshold > 2.0 * wide.optimum_error);
    assert!(wide.max > narrow.max);
    assert!(wide.min < narrow.min);
}

#[test]
fn model_comparison_agrees_with_grid_sweep() {
    let model = common::fitted_model(4.0, Some((0.02, 3)));
    let jobs = manager();
    let comparison = jobs
        .model_comparison(
            &model,
            &ParameterSelection::Globals,
            &ComparisonConfig::default().with_samples(0),
        )
        .unwrap();
    assert!(!comparison.interrupted);
    assert!(comparison.box_search.is_none());
    let expected = f_test_threshold(comparison.optimum_error, 3, common::POINTS, 0.95).unwrap();
    assert!((comparison.max_error - expected).abs() <= 1e-9 * expected);

    let interval = &comparison.intervals[0];
    assert!(interval.converged);
    assert!(interval.lower < interval.value && interval.value < interval.upper);

    // the same ceiling walked on the grid with the shifts held
    let config = ProfileConfig::default()
        .with_relax(false)
        .with_max_error(comparison.max_error);
    let increment = config.increment;
    let sweep = jobs
        .confidence(&model, &ParameterSelection::Globals, &config)
        .unwrap();
    let profile = &sweep.profiles[0];
    assert!(profile.converged);

    // the grid stops at the first step past the crossing
    assert!(profile.max >= interval.upper - 1e-6, "{} vs {}", profile.max, interval.upper);
    assert!(profile.max <= interval.upper + increment + 1e-6);
    assert!(profile.min <= interval.lower + 1e-6, "{} vs {}", profile.min, interval.lower);
    assert!(profile.min >= interval.lower - increment - 1e-6);
}

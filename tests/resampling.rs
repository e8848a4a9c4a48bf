mod common;

use eqfit_rs::statistics::{CrossValidationConfig, LeaveOut, ReductionConfig, ReductionDirection};
use eqfit_rs::{Job, JobManager, JobResult, OptimizerConfig, SubsetAdapter};

fn manager() -> JobManager {
    JobManager::new(OptimizerConfig::default().with_thread_count(4)).unwrap()
}

#[test]
fn leave_one_out_on_exact_data_recovers_the_constant() {
    let model = common::fitted_model(4.0, None);
    assert_eq!(model.point_count(), common::POINTS);

    let result = manager()
        .cross_validation(&model, &CrossValidationConfig::default())
        .unwrap();
    assert_eq!(result.fits.len(), common::POINTS);
    assert!(!result.interrupted);
    for fit in &result.fits {
        assert_eq!(fit.left_out.len(), 1);
        assert!((fit.parameters[0] - 4.0).abs() < 1e-3, "{:?}", fit);
        assert!(fit.held_out_error < 1e-8);
    }
    assert_eq!(result.parameters[0].name, "lg β(1:1)");
}

#[test]
fn noisy_cross_validation_scatters_the_constant() {
    let model = common::fitted_model(4.0, Some((0.002, 11)));
    let config = CrossValidationConfig::default().with_leave_out(LeaveOut::Two);
    let result = manager().cross_validation(&model, &config).unwrap();

    // C(11, 2)
    assert_eq!(result.fits.len(), 55);
    let log_k = &result.parameters[0];
    assert!((log_k.mean - 4.0).abs() < 0.1, "mean {}", log_k.mean);
    assert!(log_k.std_dev > 0.0 && log_k.std_dev < 0.2);
    assert!(result.mean_held_out_error > 0.0);
}

#[test]
fn reduction_drops_points_from_either_end() {
    let model = common::fitted_model(4.0, Some((0.002, 13)));
    let jobs = manager();

    let tail = jobs.reduction(&model, &ReductionConfig::default()).unwrap();
    // 10 down to 4 points kept
    assert_eq!(tail.fits.len(), 7);
    assert_eq!(tail.fits[0].left_out, vec![10]);
    assert_eq!(tail.fits[6].left_out, (4..11).collect::<Vec<_>>());

    let both = jobs
        .reduction(
            &model,
            &ReductionConfig::default().with_direction(ReductionDirection::Both),
        )
        .unwrap();
    assert_eq!(both.fits.len(), 14);
    assert_eq!(both.fits[7].left_out, vec![1]);
    assert!(both.fits.iter().all(|f| f.parameters[0].is_finite()));
}

#[test]
fn resampling_jobs_run_from_a_queue() {
    let model = common::fitted_model(4.0, Some((0.002, 17)));
    let queue = vec![
        Job::CrossValidation(CrossValidationConfig::default()),
        Job::Reduction(ReductionConfig::default().with_min_points(8)),
    ];
    let results = manager().run_jobs(&model, &queue).unwrap();
    match (&results[0], &results[1]) {
        (JobResult::CrossValidation(cv), JobResult::Reduction(r)) => {
            assert_eq!(cv.fits.len(), common::POINTS);
            assert_eq!(r.fits.len(), 3);
        }
        other => panic!("unexpected results {:?}", other),
    }
}

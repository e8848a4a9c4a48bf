mod common;

use eqfit_rs::statistics::MonteCarloConfig;
use eqfit_rs::{Job, JobManager, JobResult, OptimizerConfig, ParameterSelection};

fn manager(threads: usize) -> JobManager {
    JobManager::new(OptimizerConfig::default().with_thread_count(threads)).unwrap()
}

#[test]
fn seeded_runs_are_reproducible_across_pool_sizes() {
    let model = common::fitted_model(4.0, Some((0.002, 1)));
    let config = MonteCarloConfig::default().with_trials(24).with_seed(2024);

    let wide = manager(4).monte_carlo(&model, &config).unwrap();
    let narrow = manager(1).monte_carlo(&model, &config).unwrap();
    assert_eq!(wide, narrow);
    assert_eq!(wide.completed, 24);
}

#[test]
fn refitted_constants_scatter_around_truth() {
    let model = common::fitted_model(4.0, None);
    let config = MonteCarloConfig::default()
        .with_trials(60)
        .with_sigma(0.002)
        .with_seed(17);
    let result = manager(4).monte_carlo(&model, &config).unwrap();

    assert_eq!(result.sigma, 0.002);
    assert_eq!(result.parameters.len(), 3);
    let log_k = &result.parameters[0];
    assert_eq!(log_k.name, "lg β(1:1)");
    assert!((log_k.mean - 4.0).abs() < 0.05, "mean {}", log_k.mean);
    assert!(log_k.std_dev > 0.0 && log_k.std_dev < 0.2);

    let bar = log_k.bar.unwrap();
    assert!(bar.lower <= log_k.median && log_k.median <= bar.upper);
}

#[test]
fn job_queue_runs_in_order() {
    let model = common::fitted_model(4.0, Some((0.002, 2)));
    let queue = vec![
        Job::MonteCarlo(MonteCarloConfig::default().with_trials(8)),
        Job::Confidence {
            selection: ParameterSelection::Globals,
            config: Default::default(),
        },
    ];
    let results = manager(2).run_jobs(&model, &queue).unwrap();
    assert!(matches!(results[0], JobResult::MonteCarlo(_)));
    assert!(matches!(results[1], JobResult::Confidence(_)));
}

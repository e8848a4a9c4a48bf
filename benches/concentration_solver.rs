//! Benchmarks for the concentration solvers and a full 1:1 fit.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eqfit_rs::models::{nmr_titration, TitrationData};
use eqfit_rs::solver::{solver_for, EquilibriumSolver, SolverConfig, Species, StabilityConstants};
use eqfit_rs::{Minimizer, ModelAdapter, OptimizerConfig, ResampleAdapter};
use ndarray::{Array1, Array2};

fn bench_solvers(c: &mut Criterion) {
    let models: Vec<(&str, Vec<Species>, Vec<f64>)> = vec![
        ("1:1", vec![Species::new(1, 1)], vec![4.0]),
        (
            "2:1/1:1",
            vec![Species::new(1, 1), Species::new(2, 1)],
            vec![4.0, 7.0],
        ),
        (
            "2:1/1:1/1:2",
            vec![Species::new(2, 1), Species::new(1, 1), Species::new(1, 2)],
            vec![6.5, 3.5, 6.0],
        ),
        (
            "polynomial 3:1",
            vec![Species::new(1, 1), Species::new(3, 1)],
            vec![2.0, 8.0],
        ),
    ];

    let mut group = c.benchmark_group("solve_titration");
    for (name, species, log_beta) in &models {
        let constants = StabilityConstants::from_species(species, log_beta).unwrap();
        let solver = solver_for(species, SolverConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(name), &constants, |b, constants| {
            b.iter(|| {
                for i in 0..=20 {
                    let guest = 2.5e-4 * i as f64;
                    black_box(solver.solve(constants, black_box(1e-3), guest));
                }
            })
        });
    }
    group.finish();
}

fn bench_fit(c: &mut Criterion) {
    let host = Array1::from_elem(21, 1e-3);
    let guest = Array1::linspace(0.0, 5e-3, 21);
    let config = OptimizerConfig::default();
    let data = TitrationData::new(host.clone(), guest.clone(), Array2::zeros((21, 1))).unwrap();
    let simulator = nmr_titration(data, &[Species::new(1, 1)], &config)
        .unwrap()
        .with_log_constants(&[4.0])
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap();
    let shifts = simulator.calculated_signal().into_shape((21, 1)).unwrap();
    let data = TitrationData::new(host, guest, shifts).unwrap();
    let model = nmr_titration(data, &[Species::new(1, 1)], &config)
        .unwrap()
        .with_log_constants(&[3.0])
        .unwrap();

    c.bench_function("fit_one_to_one", |b| {
        b.iter(|| {
            let mut model = model.clone();
            let outcome = Minimizer::new(config.clone())
                .minimize(&mut model, &[])
                .unwrap();
            black_box(model.parameter(0) + outcome.error)
        })
    });
}

criterion_group!(benches, bench_solvers, bench_fit);
criterion_main!(benches);

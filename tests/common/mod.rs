//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use eqfit_rs::models::{nmr_titration, TitrationData, TitrationModel};
use eqfit_rs::solver::Species;
use eqfit_rs::{ModelAdapter, OptimizerConfig, ResampleAdapter};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub const HOST: f64 = 1e-3;
pub const POINTS: usize = 11;

/// Host held at 1 mM, guest from 0 to 5 mM.
pub fn titration_totals() -> (Array1<f64>, Array1<f64>) {
    (
        Array1::from_elem(POINTS, HOST),
        Array1::linspace(0.0, 5e-3, POINTS),
    )
}

/// NMR shifts of a 1:1 system with `lg K = log_k`, free shift 7.0 and
/// complex shift 8.0, optionally with seeded Gaussian noise.
pub fn simulated_shifts(log_k: f64, noise: Option<(f64, u64)>) -> Array2<f64> {
    let (host, guest) = titration_totals();
    let data = TitrationData::new(host, guest, Array2::zeros((POINTS, 1))).unwrap();
    let simulator = nmr_titration(data, &[Species::new(1, 1)], &OptimizerConfig::default())
        .unwrap()
        .with_log_constants(&[log_k])
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap();

    let mut shifts = simulator.calculated_signal();
    if let Some((sigma, seed)) = noise {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        shifts.mapv_inplace(|s| s + normal.sample(&mut rng));
    }
    shifts.into_shape((POINTS, 1)).unwrap()
}

/// An unfitted 1:1 NMR model over `simulated_shifts`, starting at `lg K = 3`.
pub fn one_to_one_model(log_k: f64, noise: Option<(f64, u64)>) -> TitrationModel {
    let (host, guest) = titration_totals();
    let data = TitrationData::new(host, guest, simulated_shifts(log_k, noise)).unwrap();
    let model = nmr_titration(data, &[Species::new(1, 1)], &OptimizerConfig::default())
        .unwrap()
        .with_log_constants(&[3.0])
        .unwrap();
    assert!(!model.is_corrupt());
    model
}

/// `one_to_one_model` fitted to convergence.
pub fn fitted_model(log_k: f64, noise: Option<(f64, u64)>) -> TitrationModel {
    let mut model = one_to_one_model(log_k, noise);
    let outcome = eqfit_rs::Minimizer::default()
        .minimize(&mut model, &[])
        .unwrap();
    assert!(outcome.is_converged(), "{}", outcome);
    model
}

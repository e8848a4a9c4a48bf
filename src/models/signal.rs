//! Signal strategies.
//!
//! A strategy turns the species distribution of one datapoint into the signal
//! an instrument would observe. The concentration model stays the same no
//! matter which technique recorded the titration.

use std::fmt;

use crate::solver::{Equilibrium, Species};

/// Species distribution of one datapoint.
#[derive(Debug, Clone, Copy)]
pub struct PointState<'a> {
    /// Total host concentration
    pub host0: f64,
    /// Total guest concentration
    pub guest0: f64,
    /// Free concentrations
    pub free: &'a Equilibrium,
    /// Species of the model
    pub species: &'a [Species],
    /// Concentration of each species, same order as `species`
    pub complexes: &'a [f64],
}

/// Maps a species distribution to an observable.
pub trait SignalStrategy: fmt::Debug + Send + Sync {
    /// Signal of one series.
    ///
    /// # Arguments
    ///
    /// * `point` - Species distribution of the datapoint
    /// * `baseline` - Signal parameter of the free host
    /// * `species_signals` - Signal parameter of each species
    fn signal(&self, point: &PointState<'_>, baseline: f64, species_signals: &[f64]) -> f64;

    /// Starting values `(baseline, species signal)` from the first and last
    /// datapoint, each given as `(host0, observed signal)`.
    fn guess(&self, first: (f64, f64), last: (f64, f64)) -> (f64, f64) {
        (first.1, last.1)
    }

    fn name(&self) -> &'static str;
}

/// Fast-exchange NMR: the observed shift is the host-fraction weighted mean
/// of the shifts of every host-containing species.
#[derive(Debug, Clone, Copy, Default)]
pub struct FastExchangeShift;

impl SignalStrategy for FastExchangeShift {
    fn signal(&self, point: &PointState<'_>, baseline: f64, species_signals: &[f64]) -> f64 {
        if point.host0 <= 0.0 {
            return baseline;
        }
        let bound: f64 = point
            .species
            .iter()
            .zip(point.complexes)
            .zip(species_signals)
            .map(|((s, c), shift)| shift * s.a as f64 * c)
            .sum();
        (baseline * point.free.a + bound) / point.host0
    }

    fn name(&self) -> &'static str {
        "fast exchange"
    }
}

/// UV/Vis absorbance: Beer-Lambert sum over the free host and every complex,
/// with the parameters acting as molar absorptivities at unit path length.
#[derive(Debug, Clone, Copy, Default)]
pub struct Absorbance;

impl SignalStrategy for Absorbance {
    fn signal(&self, point: &PointState<'_>, baseline: f64, species_signals: &[f64]) -> f64 {
        let complexes: f64 = point
            .complexes
            .iter()
            .zip(species_signals)
            .map(|(c, epsilon)| epsilon * c)
            .sum();
        baseline * point.free.a + complexes
    }

    fn guess(&self, first: (f64, f64), last: (f64, f64)) -> (f64, f64) {
        let per_host = |(host0, signal): (f64, f64)| {
            if host0 > 0.0 {
                signal / host0
            } else {
                0.0
            }
        };
        (per_host(first), per_host(last))
    }

    fn name(&self) -> &'static str {
        "absorbance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolveStatus;
    use approx::assert_relative_eq;

    fn half_bound() -> (Equilibrium, Vec<Species>, Vec<f64>) {
        let free = Equilibrium {
            a: 5e-4,
            b: 5e-4,
            iterations: 1,
            status: SolveStatus::Converged,
        };
        (free, vec![Species::new(1, 1)], vec![5e-4])
    }

    #[test]
    fn test_fast_exchange_weights_by_host_fraction() {
        let (free, species, complexes) = half_bound();
        let point = PointState {
            host0: 1e-3,
            guest0: 1e-3,
            free: &free,
            species: &species,
            complexes: &complexes,
        };
        let shift = FastExchangeShift.signal(&point, 7.0, &[8.0]);
        assert_relative_eq!(shift, 7.5, epsilon = 1e-12);

        let empty = PointState { host0: 0.0, ..point };
        assert_relative_eq!(FastExchangeShift.signal(&empty, 7.0, &[8.0]), 7.0);
    }

    #[test]
    fn test_absorbance_sums_species() {
        let (free, species, complexes) = half_bound();
        let point = PointState {
            host0: 1e-3,
            guest0: 1e-3,
            free: &free,
            species: &species,
            complexes: &complexes,
        };
        let absorbance = Absorbance.signal(&point, 1000.0, &[3000.0]);
        assert_relative_eq!(absorbance, 0.5 + 1.5, epsilon = 1e-12);

        let (baseline, complex) = Absorbance.guess((1e-3, 1.0), (1e-3, 3.0));
        assert_relative_eq!(baseline, 1000.0);
        assert_relative_eq!(complex, 3000.0);
    }
}

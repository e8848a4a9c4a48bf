//! Data-driven binding model.

use log::warn;
use ndarray::{Array1, Array2};
use std::sync::Arc;

use super::data::TitrationData;
use super::signal::{PointState, SignalStrategy};
use crate::config::OptimizerConfig;
use crate::error::{EqFitError, Result};
use crate::interrupt::Interrupt;
use crate::model::{ModelAdapter, ResampleAdapter, SubsetAdapter};
use crate::parameters::{Parameter, ParameterVector};
use crate::solver::{
    solver_for, Equilibrium, EquilibriumSolver, Species, SolverConfig, StabilityConstants,
};

/// A binding model fitted to titration data.
///
/// The parameter vector holds one `log β` per species followed, for every
/// signal series, by the baseline (free host) signal and one signal per
/// species:
///
/// ```text
/// [lg β(s1) .. lg β(sN) | free₁ s1₁ .. sN₁ | free₂ s1₂ .. sN₂ | ...]
/// ```
///
/// Any stoichiometry is accepted; the solver is picked from the species set
/// and the observable is delegated to a [`SignalStrategy`].
#[derive(Debug, Clone)]
pub struct TitrationModel {
    data: TitrationData,
    species: Vec<Species>,
    constants: StabilityConstants,
    parameters: ParameterVector,
    solver: Arc<dyn EquilibriumSolver>,
    strategy: Arc<dyn SignalStrategy>,
    calculated: Array2<f64>,
    equilibria: Vec<Equilibrium>,
    corrupt: bool,
    parallel: bool,
}

impl TitrationModel {
    /// Create a model
    ///
    /// # Arguments
    ///
    /// * `data` - Totals and observed signals
    /// * `species` - Complex species of the binding model
    /// * `strategy` - How species concentrations map to the observable
    /// * `config` - Solver tolerances are taken from here
    ///
    /// # Returns
    ///
    /// * A model with `lg β = 2·(a + b - 1)` per species and signal
    ///   parameters guessed from the data, already recalculated
    pub fn new<S>(
        data: TitrationData,
        species: &[Species],
        strategy: S,
        config: &OptimizerConfig,
    ) -> Result<Self>
    where
        S: SignalStrategy + 'static,
    {
        let log_beta: Vec<f64> = species
            .iter()
            .map(|s| 2.0 * (s.a + s.b - 1) as f64)
            .collect();
        let constants = StabilityConstants::from_species(species, &log_beta)?;

        let mut parameters = ParameterVector::new();
        for (s, &value) in species.iter().zip(&log_beta) {
            parameters.push(Parameter::global(&format!("lg β({})", s), value))?;
        }
        for series in 1..=data.series_count() {
            parameters.push(Parameter::local(&format!("signal {} free", series), 0.0))?;
            for s in species {
                parameters.push(Parameter::local(&format!("signal {} {}", series, s), 0.0))?;
            }
        }

        let solver = solver_for(species, SolverConfig::from(config));
        let calculated = Array2::zeros(data.signals().dim());
        let equilibria = Vec::with_capacity(data.len());

        let mut model = Self {
            data,
            species: species.to_vec(),
            constants,
            parameters,
            solver,
            strategy: Arc::new(strategy),
            calculated,
            equilibria,
            corrupt: false,
            parallel: true,
        };
        model.guess_signals()?;
        model.recalculate();
        Ok(model)
    }

    /// Set the starting stability constants, one per species.
    pub fn with_log_constants(mut self, log_beta: &[f64]) -> Result<Self> {
        if log_beta.len() != self.species.len() {
            return Err(EqFitError::DimensionMismatch(format!(
                "{} species but {} constants",
                self.species.len(),
                log_beta.len()
            )));
        }
        for (index, &value) in log_beta.iter().enumerate() {
            self.parameters.set_value(index, value)?;
        }
        self.recalculate();
        Ok(self)
    }

    /// Set the signal parameters of one series: baseline first, then one
    /// value per species.
    pub fn with_signals(mut self, series: usize, signals: &[f64]) -> Result<Self> {
        let expected = 1 + self.species.len();
        if series >= self.data.series_count() || signals.len() != expected {
            return Err(EqFitError::InvalidParameter(format!(
                "series {} takes {} signal parameters, got {}",
                series,
                expected,
                signals.len()
            )));
        }
        let offset = self.signal_offset(series);
        for (k, &value) in signals.iter().enumerate() {
            self.parameters.set_value(offset + k, value)?;
        }
        self.recalculate();
        Ok(self)
    }

    /// Force a particular solver instead of the one picked from the species.
    pub fn with_solver(mut self, solver: Arc<dyn EquilibriumSolver>) -> Self {
        self.solver = solver;
        self.recalculate();
        self
    }

    /// Let the concentration solver poll an interrupt flag.
    ///
    /// The installed solver keeps its kind and tolerances, so this may follow
    /// [`with_solver`](Self::with_solver).
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        let config = self.solver.config().clone().with_interrupt(interrupt);
        self.solver = self.solver.with_config(config);
        self.recalculate();
        self
    }

    /// Name of the installed concentration solver.
    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Declare whether clones of this model may be evaluated concurrently.
    pub fn with_parallel_evaluation(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Guess baselines from the first datapoint and species signals from the
    /// last one, for every series.
    pub fn guess_signals(&mut self) -> Result<()> {
        let last = self.data.len() - 1;
        let host = self.data.host();
        for series in 0..self.data.series_count() {
            let signals = self.data.signals();
            let (baseline, bound) = self.strategy.guess(
                (host[0], signals[[0, series]]),
                (host[last], signals[[last, series]]),
            );
            let offset = self.signal_offset(series);
            self.parameters.set_value(offset, baseline)?;
            for k in 0..self.species.len() {
                self.parameters.set_value(offset + 1 + k, bound)?;
            }
        }
        Ok(())
    }

    fn signal_offset(&self, series: usize) -> usize {
        self.species.len() + series * (1 + self.species.len())
    }

    pub fn data(&self) -> &TitrationData {
        &self.data
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Stability constants as of the last recalculation.
    pub fn constants(&self) -> &StabilityConstants {
        &self.constants
    }

    /// Calculated signals as of the last recalculation.
    pub fn calculated(&self) -> &Array2<f64> {
        &self.calculated
    }

    /// Free concentrations per datapoint as of the last recalculation.
    pub fn free_concentrations(&self) -> &[Equilibrium] {
        &self.equilibria
    }

    /// Name of the signal strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    fn sync_constants(&mut self) -> bool {
        for (k, s) in self.species.iter().enumerate() {
            let value = self.parameters[k].value();
            if self.constants.set_log_beta(*s, value).is_err() {
                return false;
            }
        }
        true
    }
}

impl ModelAdapter for TitrationModel {
    fn parameters(&self) -> &ParameterVector {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterVector {
        &mut self.parameters
    }

    fn recalculate(&mut self) {
        if !self.sync_constants() {
            self.corrupt = true;
            return;
        }

        self.equilibria.clear();
        let n_species = self.species.len();
        let mut complexes = vec![0.0; n_species];
        let mut corrupt = false;

        for i in 0..self.data.len() {
            let host0 = self.data.host()[i];
            let guest0 = self.data.guest()[i];
            let free = self.solver.solve(&self.constants, host0, guest0);
            if !free.is_physical(host0, guest0) {
                corrupt = true;
            }
            for (c, s) in complexes.iter_mut().zip(&self.species) {
                *c = free.complex(&self.constants, *s);
            }

            let point = PointState {
                host0,
                guest0,
                free: &free,
                species: &self.species,
                complexes: &complexes,
            };
            for series in 0..self.data.series_count() {
                let offset = self.signal_offset(series);
                let baseline = self.parameters[offset].value();
                let species_signals: Vec<f64> = (0..n_species)
                    .map(|k| self.parameters[offset + 1 + k].value())
                    .collect();
                let value = self.strategy.signal(&point, baseline, &species_signals);
                if !value.is_finite() {
                    corrupt = true;
                }
                self.calculated[[i, series]] = value;
            }
            self.equilibria.push(free);
        }

        if corrupt && !self.corrupt {
            warn!(
                "{} model produced unphysical concentrations or signals",
                self.solver.name()
            );
        }
        self.corrupt |= corrupt;
    }

    fn residuals(&self) -> Array1<f64> {
        (self.data.signals() - &self.calculated).iter().copied().collect()
    }

    fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    fn clear_corrupt(&mut self) {
        self.corrupt = false;
    }

    fn unconverged_points(&self) -> usize {
        self.equilibria
            .iter()
            .filter(|eq| !eq.status.is_converged())
            .count()
    }

    fn supports_parallel_evaluation(&self) -> bool {
        self.parallel
    }
}

impl SubsetAdapter for TitrationModel {
    fn point_count(&self) -> usize {
        self.data.len()
    }

    fn subset(&self, keep: &[usize]) -> Result<Self> {
        let data = self.data.select(keep)?;
        let mut model = Self {
            calculated: Array2::zeros(data.signals().dim()),
            equilibria: Vec::with_capacity(data.len()),
            data,
            species: self.species.clone(),
            constants: self.constants.clone(),
            parameters: self.parameters.clone(),
            solver: Arc::clone(&self.solver),
            strategy: Arc::clone(&self.strategy),
            corrupt: false,
            parallel: self.parallel,
        };
        model.recalculate();
        Ok(model)
    }
}

impl ResampleAdapter for TitrationModel {
    fn observed_signal(&self) -> Array1<f64> {
        self.data.signals().iter().copied().collect()
    }

    fn calculated_signal(&self) -> Array1<f64> {
        self.calculated.iter().copied().collect()
    }

    fn replace_observed(&mut self, values: &Array1<f64>) -> Result<()> {
        let shape = self.data.signals().dim();
        let signals = Array2::from_shape_vec(shape, values.to_vec()).map_err(|e| {
            EqFitError::DimensionMismatch(format!(
                "cannot reshape {} values into {:?}: {}",
                values.len(),
                shape,
                e
            ))
        })?;
        self.data.set_signals(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Absorbance, FastExchangeShift};
    use crate::solver::{PolynomialSolver, SolveStatus};
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn one_to_one_data() -> TitrationData {
        let guest = Array1::linspace(0.0, 5e-3, 11);
        let host = Array1::from_elem(11, 1e-3);
        TitrationData::new(host, guest, Array2::zeros((11, 1))).unwrap()
    }

    #[test]
    fn test_parameter_layout() {
        let species = [Species::new(1, 1), Species::new(2, 1)];
        let data = TitrationData::new(
            array![1e-3, 1e-3],
            array![0.0, 1e-3],
            Array2::zeros((2, 2)),
        )
        .unwrap();
        let model =
            TitrationModel::new(data, &species, FastExchangeShift, &OptimizerConfig::default())
                .unwrap();

        // 2 constants + 2 series × (baseline + 2 species)
        assert_eq!(model.parameter_count(), 8);
        assert_eq!(model.parameters().global_indices(), vec![0, 1]);
        assert_eq!(model.parameter_name(0), "lg β(1:1)");
        assert_eq!(model.parameter_name(5), "signal 2 free");
        assert_relative_eq!(model.parameter(1), 4.0);
        assert!(model.is_global(1) && !model.is_global(2));
    }

    #[test]
    fn test_simulated_data_has_zero_residuals() {
        let mut model = TitrationModel::new(
            one_to_one_data(),
            &[Species::new(1, 1)],
            FastExchangeShift,
            &OptimizerConfig::default(),
        )
        .unwrap()
        .with_log_constants(&[4.0])
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap();

        let simulated = model.calculated_signal();
        model.replace_observed(&simulated).unwrap();
        assert!(model.sum_of_squares() < 1e-24);
        assert!(!model.is_corrupt());
        assert_eq!(model.unconverged_points(), 0);

        // first point has no guest, the shift is the free host shift
        assert_relative_eq!(simulated[0], 7.0, epsilon = 1e-12);
        // the shift moves towards the complex shift monotonically
        for pair in simulated.as_slice().unwrap().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_subset_keeps_parameters_and_rows() {
        let model = TitrationModel::new(
            one_to_one_data(),
            &[Species::new(1, 1)],
            FastExchangeShift,
            &OptimizerConfig::default(),
        )
        .unwrap()
        .with_log_constants(&[4.0])
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap();
        let full = model.calculated_signal();

        let subset = model.subset(&[0, 3, 10]).unwrap();
        assert_eq!(subset.point_count(), 3);
        assert_eq!(subset.export_state(), model.export_state());
        assert_eq!(subset.free_concentrations().len(), 3);
        let calculated = subset.calculated_signal();
        assert_relative_eq!(calculated[1], full[3], epsilon = 1e-12);
        assert_relative_eq!(calculated[2], full[10], epsilon = 1e-12);

        assert!(model.subset(&[11]).is_err());
    }

    #[test]
    fn test_state_round_trip() {
        let mut model = TitrationModel::new(
            one_to_one_data(),
            &[Species::new(1, 1)],
            Absorbance,
            &OptimizerConfig::default(),
        )
        .unwrap()
        .with_signals(0, &[1000.0, 3000.0])
        .unwrap();
        let state = model.export_state();
        let before = model.calculated_signal();

        model.set_parameter(0, 6.0).unwrap();
        model.recalculate();
        assert!(model.calculated_signal() != before);

        model.import_state(&state).unwrap();
        assert_eq!(model.calculated_signal(), before);
        assert!(model.import_state(&array![1.0]).is_err());
    }

    #[test]
    fn test_forced_solver_gives_same_signal() {
        let species = [Species::new(1, 1)];
        let model = TitrationModel::new(
            one_to_one_data(),
            &species,
            FastExchangeShift,
            &OptimizerConfig::default(),
        )
        .unwrap()
        .with_log_constants(&[3.5])
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap();
        let general = model
            .clone()
            .with_solver(Arc::new(PolynomialSolver::new(SolverConfig::default())));

        for (x, y) in model
            .calculated_signal()
            .iter()
            .zip(general.calculated_signal().iter())
        {
            assert_relative_eq!(x, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_interrupt_keeps_forced_solver() {
        let capped = SolverConfig {
            max_iterations: 1,
            ..SolverConfig::default()
        };
        let model = TitrationModel::new(
            one_to_one_data(),
            &[Species::new(1, 1)],
            FastExchangeShift,
            &OptimizerConfig::default(),
        )
        .unwrap()
        .with_signals(0, &[7.0, 8.0])
        .unwrap()
        .with_solver(Arc::new(PolynomialSolver::new(capped)))
        .with_interrupt(Interrupt::new());

        assert_eq!(model.solver_name(), "polynomial");
        // the one-iteration cap survived, so every titrated point misses it
        assert_eq!(model.unconverged_points(), 10);

        let interrupt = Interrupt::new();
        interrupt.trigger();
        let stopped = model.with_interrupt(interrupt);
        assert_eq!(stopped.solver_name(), "polynomial");
        let statuses: Vec<SolveStatus> = stopped
            .free_concentrations()
            .iter()
            .map(|eq| eq.status)
            .collect();
        assert_eq!(statuses[0], SolveStatus::Trivial);
        assert!(statuses[1..].iter().all(|s| *s == SolveStatus::Interrupted));
    }

    #[test]
    fn test_replace_observed_checks_length() {
        let mut model = TitrationModel::new(
            one_to_one_data(),
            &[Species::new(1, 1)],
            FastExchangeShift,
            &OptimizerConfig::default(),
        )
        .unwrap();
        assert!(model.replace_observed(&array![1.0, 2.0]).is_err());
    }
}

//! Small analytic models shared by the unit tests.

use ndarray::{array, Array1};

use crate::model::{ModelAdapter, ResampleAdapter, SubsetAdapter};
use crate::parameters::{Parameter, ParameterVector};
use crate::{EqFitError, Result};

/// Residuals `[offset, k·(x - x*), y - y*]`.
///
/// At the optimum the error is `offset²`; sweeping `x` with `y` relaxed
/// traces the parabola `offset² + k²·(x - x*)²`.
#[derive(Debug, Clone)]
pub(crate) struct QuadraticModel {
    parameters: ParameterVector,
    pub target: (f64, f64),
    pub curvature: f64,
    pub offset: f64,
    residuals: Array1<f64>,
    observed: Array1<f64>,
    corrupt: bool,
}

impl QuadraticModel {
    pub fn new(x: f64, y: f64) -> Self {
        let mut parameters = ParameterVector::new();
        parameters.push(Parameter::global("x", x)).unwrap();
        parameters.push(Parameter::local("y", y)).unwrap();
        let mut model = Self {
            parameters,
            target: (2.0, -1.0),
            curvature: 10.0,
            offset: 1.0,
            residuals: Array1::zeros(3),
            observed: Array1::zeros(3),
            corrupt: false,
        };
        model.recalculate();
        model
    }

    pub fn with_curvature(mut self, curvature: f64) -> Self {
        self.curvature = curvature;
        self.recalculate();
        self
    }

    fn calculated(&self) -> Array1<f64> {
        let x = self.parameters[0].value();
        let y = self.parameters[1].value();
        array![
            -self.offset,
            -self.curvature * (x - self.target.0),
            -(y - self.target.1)
        ]
    }
}

impl ModelAdapter for QuadraticModel {
    fn parameters(&self) -> &ParameterVector {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterVector {
        &mut self.parameters
    }

    fn recalculate(&mut self) {
        self.residuals = &self.observed - &self.calculated();
        if self.residuals.iter().any(|r| !r.is_finite()) {
            self.corrupt = true;
        }
    }

    fn residuals(&self) -> Array1<f64> {
        self.residuals.clone()
    }

    fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    fn clear_corrupt(&mut self) {
        self.corrupt = false;
    }
}

impl ResampleAdapter for QuadraticModel {
    fn observed_signal(&self) -> Array1<f64> {
        self.observed.clone()
    }

    fn calculated_signal(&self) -> Array1<f64> {
        self.calculated()
    }

    fn replace_observed(&mut self, values: &Array1<f64>) -> Result<()> {
        if values.len() != self.observed.len() {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected {} observations, got {}",
                self.observed.len(),
                values.len()
            )));
        }
        self.observed = values.clone();
        Ok(())
    }
}

/// Straight line `y = a + b·x`, one residual per datapoint.
#[derive(Debug, Clone)]
pub(crate) struct LineModel {
    parameters: ParameterVector,
    x: Array1<f64>,
    observed: Array1<f64>,
    residuals: Array1<f64>,
}

impl LineModel {
    /// `observed` at `x = 0, 1, 2, ...`, starting from `a = b = 0`.
    pub fn new(observed: Array1<f64>) -> Self {
        let mut parameters = ParameterVector::new();
        parameters.push(Parameter::global("a", 0.0)).unwrap();
        parameters.push(Parameter::local("b", 0.0)).unwrap();
        let x = Array1::range(0.0, observed.len() as f64, 1.0);
        let mut model = Self {
            parameters,
            residuals: Array1::zeros(x.len()),
            x,
            observed,
        };
        model.recalculate();
        model
    }

    fn calculated(&self) -> Array1<f64> {
        let a = self.parameters[0].value();
        let b = self.parameters[1].value();
        self.x.mapv(|x| a + b * x)
    }
}

impl ModelAdapter for LineModel {
    fn parameters(&self) -> &ParameterVector {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterVector {
        &mut self.parameters
    }

    fn recalculate(&mut self) {
        self.residuals = &self.observed - &self.calculated();
    }

    fn residuals(&self) -> Array1<f64> {
        self.residuals.clone()
    }

    fn is_corrupt(&self) -> bool {
        false
    }

    fn clear_corrupt(&mut self) {}
}

impl ResampleAdapter for LineModel {
    fn observed_signal(&self) -> Array1<f64> {
        self.observed.clone()
    }

    fn calculated_signal(&self) -> Array1<f64> {
        self.calculated()
    }

    fn replace_observed(&mut self, values: &Array1<f64>) -> Result<()> {
        if values.len() != self.observed.len() {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected {} observations, got {}",
                self.observed.len(),
                values.len()
            )));
        }
        self.observed = values.clone();
        Ok(())
    }
}

impl SubsetAdapter for LineModel {
    fn point_count(&self) -> usize {
        self.x.len()
    }

    fn subset(&self, keep: &[usize]) -> Result<Self> {
        if let Some(&bad) = keep.iter().find(|&&i| i >= self.x.len()) {
            return Err(EqFitError::InvalidInput(format!("no datapoint {}", bad)));
        }
        let mut model = self.clone();
        model.x = keep.iter().map(|&i| self.x[i]).collect();
        model.observed = keep.iter().map(|&i| self.observed[i]).collect();
        model.recalculate();
        Ok(model)
    }
}

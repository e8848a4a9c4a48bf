//! Ordered parameter collection.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::Index;

use super::parameter::Parameter;
use crate::error::{EqFitError, Result};

/// The ordered parameters of one model.
///
/// Order matters: the optimizer, the confidence engine and state
/// checkpoints all address parameters by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    params: Vec<Parameter>,
}

impl ParameterVector {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, names must be unique.
    pub fn push(&mut self, param: Parameter) -> Result<usize> {
        if self.index_of(&param.name).is_some() {
            return Err(EqFitError::InvalidParameter(format!(
                "parameter '{}' already exists",
                param.name
            )));
        }
        self.params.push(param);
        Ok(self.params.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Parameter> {
        self.params.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Position of a parameter by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    fn checked_mut(&mut self, index: usize) -> Result<&mut Parameter> {
        let len = self.params.len();
        self.params.get_mut(index).ok_or_else(|| {
            EqFitError::InvalidParameter(format!(
                "parameter index {} out of range for {} parameters",
                index, len
            ))
        })
    }

    /// Set the value of one parameter.
    pub fn set_value(&mut self, index: usize, value: f64) -> Result<()> {
        self.checked_mut(index)?.set_value(value)
    }

    /// Lock or unlock one parameter.
    pub fn set_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        self.checked_mut(index)?.locked = locked;
        Ok(())
    }

    /// All values in order.
    pub fn values(&self) -> Array1<f64> {
        self.params.iter().map(Parameter::value).collect()
    }

    /// Overwrite all values at once.
    pub fn set_values(&mut self, values: &Array1<f64>) -> Result<()> {
        if values.len() != self.params.len() {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected {} parameter values, got {}",
                self.params.len(),
                values.len()
            )));
        }
        for (param, &value) in self.params.iter_mut().zip(values.iter()) {
            param.set_value(value)?;
        }
        Ok(())
    }

    /// Lock flags in order.
    pub fn locked_mask(&self) -> Vec<bool> {
        self.params.iter().map(|p| p.locked).collect()
    }

    /// Positions of unlocked parameters.
    pub fn free_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.locked)
            .map(|(i, _)| i)
            .collect()
    }

    /// Positions of stability constants.
    pub fn global_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_global())
            .map(|(i, _)| i)
            .collect()
    }

    /// Names in order.
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }
}

impl Index<usize> for ParameterVector {
    type Output = Parameter;

    fn index(&self, index: usize) -> &Parameter {
        &self.params[index]
    }
}

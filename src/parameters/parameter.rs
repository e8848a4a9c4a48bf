//! Parameter definition and implementation
//!
//! A binding model has two kinds of parameters: stability constants, which are
//! shared by every signal series, and signal parameters (baselines and
//! per-species signals) that belong to one series only.

use serde::{Deserialize, Serialize};

use crate::error::{EqFitError, Result};

/// Whether a parameter is shared by the whole model or belongs to one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// Stability constant, `log10 β`
    Global,
    /// Baseline or species signal of one series
    Local,
}

/// A named fit parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    pub name: String,

    /// Current value of the parameter
    value: f64,

    /// Value when created (for reset operations)
    init_value: f64,

    /// Locked parameters are held fixed by every fit
    pub locked: bool,

    /// Global or local
    pub kind: ParameterKind,
}

impl Parameter {
    /// Create a new, unlocked parameter
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the parameter
    /// * `value` - Initial value of the parameter
    /// * `kind` - Whether the parameter is a stability constant or a signal
    pub fn new(name: &str, value: f64, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            value,
            init_value: value,
            locked: false,
            kind,
        }
    }

    /// Create a stability-constant parameter.
    pub fn global(name: &str, value: f64) -> Self {
        Self::new(name, value, ParameterKind::Global)
    }

    /// Create a signal parameter.
    pub fn local(name: &str, value: f64) -> Self {
        Self::new(name, value, ParameterKind::Local)
    }

    /// Builder-style lock flag.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the value, non-finite values are rejected.
    pub fn set_value(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(EqFitError::InvalidParameter(format!(
                "parameter '{}' cannot take the value {}",
                self.name, value
            )));
        }
        self.value = value;
        Ok(())
    }

    /// Value the parameter was created with.
    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    /// Return to the initial value.
    pub fn reset(&mut self) {
        self.value = self.init_value;
    }

    pub fn is_global(&self) -> bool {
        self.kind == ParameterKind::Global
    }
}

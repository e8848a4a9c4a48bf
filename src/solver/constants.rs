//! Stability constants indexed by stoichiometry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EqFitError, Result};

/// A complex species `A_a B_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Species {
    /// Number of A (host) units
    pub a: u32,
    /// Number of B (guest) units
    pub b: u32,
}

impl Species {
    /// Create a species, both counts must be at least one.
    pub const fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.a, self.b)
    }
}

/// Overall stability constants `log10 β(a, b)` of a binding model.
///
/// The table spans `1 ≤ a ≤ max_a`, `1 ≤ b ≤ max_b` with flat index
/// `(a - 1)·max_b + (b - 1)`. Slots of species that are not part of the model
/// hold no value and contribute `β = 0` to the mass balances.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityConstants {
    max_a: usize,
    max_b: usize,
    log_beta: Vec<Option<f64>>,
}

impl StabilityConstants {
    /// Build a full table from `max_a × max_b` values in flat-index order.
    pub fn new(max_a: usize, max_b: usize, log_beta: Vec<f64>) -> Result<Self> {
        if max_a == 0 || max_b == 0 {
            return Err(EqFitError::InvalidStoichiometry(format!(
                "table dimensions must be at least 1x1, got {}x{}",
                max_a, max_b
            )));
        }
        if log_beta.len() != max_a * max_b {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected {} stability constants for a {}x{} table, got {}",
                max_a * max_b,
                max_a,
                max_b,
                log_beta.len()
            )));
        }
        if let Some(value) = log_beta.iter().find(|v| !v.is_finite()) {
            return Err(EqFitError::InvalidParameter(format!(
                "stability constants must be finite, got {}",
                value
            )));
        }
        Ok(Self {
            max_a,
            max_b,
            log_beta: log_beta.into_iter().map(Some).collect(),
        })
    }

    /// Build a sparse table holding only the listed species.
    pub fn from_species(species: &[Species], log_beta: &[f64]) -> Result<Self> {
        if species.is_empty() {
            return Err(EqFitError::InvalidStoichiometry(
                "at least one complex species is required".to_string(),
            ));
        }
        if species.len() != log_beta.len() {
            return Err(EqFitError::DimensionMismatch(format!(
                "{} species but {} stability constants",
                species.len(),
                log_beta.len()
            )));
        }
        if let Some(s) = species.iter().find(|s| s.a == 0 || s.b == 0) {
            return Err(EqFitError::InvalidStoichiometry(format!(
                "species {} must contain both components",
                s
            )));
        }

        let max_a = species.iter().map(|s| s.a as usize).max().unwrap_or(1);
        let max_b = species.iter().map(|s| s.b as usize).max().unwrap_or(1);
        let mut table = Self {
            max_a,
            max_b,
            log_beta: vec![None; max_a * max_b],
        };
        for (s, &value) in species.iter().zip(log_beta) {
            let index = table.index(s.a as usize, s.b as usize);
            if table.log_beta[index].is_some() {
                return Err(EqFitError::InvalidStoichiometry(format!(
                    "species {} listed twice",
                    s
                )));
            }
            if !value.is_finite() {
                return Err(EqFitError::InvalidParameter(format!(
                    "stability constant of {} must be finite, got {}",
                    s, value
                )));
            }
            table.log_beta[index] = Some(value);
        }
        Ok(table)
    }

    /// Largest A count in the table.
    pub fn max_a(&self) -> usize {
        self.max_a
    }

    /// Largest B count in the table.
    pub fn max_b(&self) -> usize {
        self.max_b
    }

    /// Flat index of `(a, b)`.
    pub fn index(&self, a: usize, b: usize) -> usize {
        (a - 1) * self.max_b + (b - 1)
    }

    fn in_range(&self, a: usize, b: usize) -> bool {
        (1..=self.max_a).contains(&a) && (1..=self.max_b).contains(&b)
    }

    /// `log10 β(a, b)`, `None` for species outside the model.
    pub fn log_beta(&self, a: usize, b: usize) -> Option<f64> {
        if self.in_range(a, b) {
            self.log_beta[self.index(a, b)]
        } else {
            None
        }
    }

    /// `β(a, b) = 10^log β`, zero for species outside the model.
    pub fn beta(&self, a: usize, b: usize) -> f64 {
        self.log_beta(a, b).map_or(0.0, |value| 10f64.powf(value))
    }

    /// Overwrite the constant of a species already present in the table.
    pub fn set_log_beta(&mut self, species: Species, value: f64) -> Result<()> {
        let (a, b) = (species.a as usize, species.b as usize);
        if !self.in_range(a, b) {
            return Err(EqFitError::InvalidStoichiometry(format!(
                "species {} is outside the {}x{} table",
                species, self.max_a, self.max_b
            )));
        }
        if !value.is_finite() {
            return Err(EqFitError::InvalidParameter(format!(
                "stability constant of {} must be finite, got {}",
                species, value
            )));
        }
        let index = self.index(a, b);
        self.log_beta[index] = Some(value);
        Ok(())
    }

    /// Species with a value in the table and their `β`, in flat-index order.
    pub fn species(&self) -> Vec<(Species, f64)> {
        let mut present = Vec::new();
        for a in 1..=self.max_a {
            for b in 1..=self.max_b {
                if let Some(value) = self.log_beta(a, b) {
                    present.push((Species::new(a as u32, b as u32), 10f64.powf(value)));
                }
            }
        }
        present
    }

    /// Concentration of `A_a B_b` at the given free concentrations.
    pub fn complex_concentration(&self, species: Species, ca: f64, cb: f64) -> f64 {
        self.beta(species.a as usize, species.b as usize)
            * ca.powi(species.a as i32)
            * cb.powi(species.b as i32)
    }

    /// Total A and B held in complexes, `(Σ a·[AaBb], Σ b·[AaBb])`.
    pub fn bound(&self, ca: f64, cb: f64) -> (f64, f64) {
        self.species()
            .into_iter()
            .fold((0.0, 0.0), |(bound_a, bound_b), (s, beta)| {
                let c = beta * ca.powi(s.a as i32) * cb.powi(s.b as i32);
                (bound_a + s.a as f64 * c, bound_b + s.b as f64 * c)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_table_indexing() {
        let table = StabilityConstants::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(table.index(1, 1), 0);
        assert_eq!(table.index(2, 1), 3);
        assert_eq!(table.log_beta(2, 3), Some(6.0));
        assert_eq!(table.log_beta(3, 1), None);
        assert_relative_eq!(table.beta(1, 2), 100.0);

        assert!(StabilityConstants::new(2, 2, vec![1.0; 3]).is_err());
        assert!(StabilityConstants::new(1, 1, vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_sparse_table() {
        let species = [Species::new(2, 1), Species::new(1, 1)];
        let table = StabilityConstants::from_species(&species, &[7.0, 4.0]).unwrap();
        assert_eq!((table.max_a(), table.max_b()), (2, 1));
        assert_eq!(table.species().len(), 2);
        assert_eq!(table.species()[0].0, Species::new(1, 1));

        let table = StabilityConstants::from_species(&[Species::new(1, 2)], &[-1.5]).unwrap();
        assert_eq!(table.beta(1, 1), 0.0);
        assert_relative_eq!(table.beta(1, 2), 10f64.powf(-1.5));

        assert!(StabilityConstants::from_species(&[Species::new(0, 1)], &[1.0]).is_err());
        assert!(StabilityConstants::from_species(
            &[Species::new(1, 1), Species::new(1, 1)],
            &[1.0, 2.0]
        )
        .is_err());
    }

    #[test]
    fn test_bound_concentrations() {
        let species = [Species::new(1, 1), Species::new(2, 1)];
        let table = StabilityConstants::from_species(&species, &[3.0, 5.0]).unwrap();
        let (ca, cb) = (1e-3, 2e-3);
        let c11 = 1e3 * ca * cb;
        let c21 = 1e5 * ca * ca * cb;
        let (bound_a, bound_b) = table.bound(ca, cb);
        assert_relative_eq!(bound_a, c11 + 2.0 * c21, max_relative = 1e-12);
        assert_relative_eq!(bound_b, c11 + c21, max_relative = 1e-12);
        assert_relative_eq!(
            table.complex_concentration(Species::new(2, 1), ca, cb),
            c21,
            max_relative = 1e-12
        );

        let mut table = table;
        table.set_log_beta(Species::new(2, 1), 4.0).unwrap();
        assert_eq!(table.log_beta(2, 1), Some(4.0));
        assert!(table.set_log_beta(Species::new(1, 2), 4.0).is_err());
    }
}

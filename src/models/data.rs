//! Titration data.

use ndarray::{Array1, Array2, Axis};

use crate::error::{EqFitError, Result};

/// Total concentrations and observed signals of one titration.
///
/// Row `i` of `signals` holds the observations of every series at the
/// totals `(host[i], guest[i])`.
#[derive(Debug, Clone, PartialEq)]
pub struct TitrationData {
    host: Array1<f64>,
    guest: Array1<f64>,
    signals: Array2<f64>,
}

impl TitrationData {
    /// Create a data set
    ///
    /// # Arguments
    ///
    /// * `host` - Total host (A) concentration per datapoint
    /// * `guest` - Total guest (B) concentration per datapoint
    /// * `signals` - Observed signals, one row per datapoint, one column per series
    pub fn new(host: Array1<f64>, guest: Array1<f64>, signals: Array2<f64>) -> Result<Self> {
        if host.len() != guest.len() || host.len() != signals.nrows() {
            return Err(EqFitError::DimensionMismatch(format!(
                "{} host totals, {} guest totals and {} signal rows",
                host.len(),
                guest.len(),
                signals.nrows()
            )));
        }
        if host.is_empty() || signals.ncols() == 0 {
            return Err(EqFitError::InvalidInput(
                "a titration needs at least one datapoint and one signal series".to_string(),
            ));
        }
        let valid = |c: &f64| c.is_finite() && *c >= 0.0;
        if !host.iter().all(valid) || !guest.iter().all(valid) {
            return Err(EqFitError::InvalidInput(
                "total concentrations must be finite and non-negative".to_string(),
            ));
        }
        if signals.iter().any(|s| !s.is_finite()) {
            return Err(EqFitError::InvalidInput(
                "observed signals must be finite".to_string(),
            ));
        }
        Ok(Self {
            host,
            guest,
            signals,
        })
    }

    /// Number of datapoints.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Number of signal series.
    pub fn series_count(&self) -> usize {
        self.signals.ncols()
    }

    pub fn host(&self) -> &Array1<f64> {
        &self.host
    }

    pub fn guest(&self) -> &Array1<f64> {
        &self.guest
    }

    pub fn signals(&self) -> &Array2<f64> {
        &self.signals
    }

    /// The datapoints at `rows`, in the given order.
    pub fn select(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.len()) {
            return Err(EqFitError::InvalidInput(format!(
                "datapoint {} out of range for {} datapoints",
                bad,
                self.len()
            )));
        }
        Self::new(
            self.host.select(Axis(0), rows),
            self.guest.select(Axis(0), rows),
            self.signals.select(Axis(0), rows),
        )
    }

    /// Replace the observed signals, keeping the shape.
    pub fn set_signals(&mut self, signals: Array2<f64>) -> Result<()> {
        if signals.dim() != self.signals.dim() {
            return Err(EqFitError::DimensionMismatch(format!(
                "expected signals of shape {:?}, got {:?}",
                self.signals.dim(),
                signals.dim()
            )));
        }
        self.signals = signals;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_shape_checks() {
        let data = TitrationData::new(
            array![1e-3, 1e-3],
            array![0.0, 1e-3],
            Array2::zeros((2, 3)),
        )
        .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.series_count(), 3);

        assert!(TitrationData::new(array![1e-3], array![0.0, 1e-3], Array2::zeros((2, 1))).is_err());
        assert!(TitrationData::new(array![-1e-3], array![0.0], Array2::zeros((1, 1))).is_err());

        let mut data = data;
        assert!(data.set_signals(Array2::zeros((3, 3))).is_err());
        assert!(data.set_signals(Array2::ones((2, 3))).is_ok());
    }

    #[test]
    fn test_select_rows() {
        let data = TitrationData::new(
            array![1e-3, 1e-3, 1e-3],
            array![0.0, 1e-3, 2e-3],
            array![[7.0], [7.5], [7.8]],
        )
        .unwrap();
        let picked = data.select(&[0, 2]).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.guest(), &array![0.0, 2e-3]);
        assert_eq!(picked.signals(), &array![[7.0], [7.8]]);

        assert!(data.select(&[3]).is_err());
        assert!(data.select(&[]).is_err());
    }
}

use thiserror::Error;

/// Error types for the eqfit-rs library.
///
/// Only programming and input errors are reported through this type. Numerical
/// outcomes such as a solve that did not converge or a model that produced
/// unphysical concentrations are carried as flags on the returned values.
#[derive(Error, Debug)]
pub enum EqFitError {
    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for invalid parameter values or indices.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error for a species list or stability-constant table that does not fit
    /// the declared stoichiometry.
    #[error("Invalid stoichiometry: {0}")]
    InvalidStoichiometry(String),

    /// Error for configuration values outside their admissible range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// The worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error for cases that don't fit the other categories.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for eqfit-rs operations.
pub type Result<T> = std::result::Result<T, EqFitError>;

impl From<String> for EqFitError {
    fn from(s: String) -> Self {
        EqFitError::Other(s)
    }
}

impl From<&str> for EqFitError {
    fn from(s: &str) -> Self {
        EqFitError::Other(s.to_string())
    }
}

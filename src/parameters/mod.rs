//! # Parameter System
//!
//! Named, lockable fit parameters. A [`ParameterVector`] holds the stability
//! constants of a binding model followed by its per-series signal parameters;
//! fits address them by position and skip the locked ones.
//!
//! ```rust
//! use eqfit_rs::parameters::{Parameter, ParameterVector};
//!
//! let mut params = ParameterVector::new();
//! params.push(Parameter::global("lg b11", 4.0)).unwrap();
//! params.push(Parameter::local("free", 7.2).with_locked(true)).unwrap();
//!
//! assert_eq!(params.free_indices(), vec![0]);
//! assert_eq!(params.global_indices(), vec![0]);
//! ```

pub mod parameter;
pub mod parameters;

pub use parameter::{Parameter, ParameterKind};
pub use parameters::ParameterVector;

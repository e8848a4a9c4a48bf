//! Built-in binding models.
//!
//! There is a single, data-driven [`TitrationModel`]: the stoichiometry is a
//! list of species, the concentration solver is chosen from that list and the
//! observable is a pluggable [`SignalStrategy`]. The helpers below build the
//! common NMR and UV/Vis variants.

use crate::config::OptimizerConfig;
use crate::error::Result;
use crate::solver::Species;

mod data;
mod signal;
mod titration;

pub use data::TitrationData;
pub use signal::{Absorbance, FastExchangeShift, PointState, SignalStrategy};
pub use titration::TitrationModel;

/// Create a fast-exchange NMR titration model
///
/// # Arguments
///
/// * `data` - Totals and observed chemical shifts
/// * `species` - Complex species, e.g. `[Species::new(1, 1)]`
/// * `config` - Solver tolerances
pub fn nmr_titration(
    data: TitrationData,
    species: &[Species],
    config: &OptimizerConfig,
) -> Result<TitrationModel> {
    TitrationModel::new(data, species, FastExchangeShift, config)
}

/// Create a UV/Vis absorbance titration model
///
/// # Arguments
///
/// * `data` - Totals and observed absorbances
/// * `species` - Complex species
/// * `config` - Solver tolerances
pub fn uv_vis_titration(
    data: TitrationData,
    species: &[Species],
    config: &OptimizerConfig,
) -> Result<TitrationModel> {
    TitrationModel::new(data, species, Absorbance, config)
}

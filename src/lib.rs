#![warn(rust_2018_idioms, missing_docs, missing_debug_implementations)]

//! Reduced potentials from NAMD free energy perturbation (FEP) output, and free energy
//! differences estimated from them with the multistate Bennett acceptance ratio (MBAR) and
//! Bennett acceptance ratio (BAR) methods.
//!
//! A `.fepout` file is read into a [`UNk`] table: one row per collected frame, keyed by
//! timestep and the lambda state it was sampled from, and one column per lambda state. With
//! the `pymbar` feature enabled, the table can be handed to [`MbarEstimator`] or
//! [`BarEstimator`], which drive [pymbar](https://github.com/choderalab/pymbar) through Python.
//!
//! Please reference the following if you use MBAR in your research:
//!
//! [1] Shirts MR and Chodera JD. Statistically optimal analysis of samples from multiple
//! equilibrium states. J. Chem. Phys. 129:124105, 2008. <http://dx.doi.org/10.1063/1.2978177>

#[macro_use]
extern crate derive_builder;

pub mod errors;
pub mod estimators;
pub mod matrix;
#[cfg(feature = "pymbar")]
pub mod mbar;
pub mod namd;
pub mod segmenter;
pub mod state;
pub mod table;
pub mod window;

pub use errors::{FepError, Result};
#[cfg(feature = "pymbar")]
pub use estimators::{BarEstimator, MbarEstimator};
pub use estimators::{FepEstimator, FreeEnergyDifferences};
#[cfg(feature = "pymbar")]
pub use mbar::{InitialFreeEnergies, MBar};
pub use namd::{
    extract_u_nk, extract_u_nk_with, parse_u_nk, read_u_nk, NamdOptions, OpenWindowPolicy,
};
pub use state::StateLabel;
pub use table::{RowKey, UNk};

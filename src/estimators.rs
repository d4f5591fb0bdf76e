//! Free energy estimators that consume a [`UNk`] table.
//!
//! The estimators themselves are provided by `pymbar` and are only available with the
//! `pymbar` feature. Preparing their input from a table and assembling their output into
//! [`FreeEnergyDifferences`] is plain Rust.

use crate::errors::*;
use crate::state::StateLabel;
use crate::table::UNk;
use itertools::Itertools;
use ndarray::{Array1, Array2};

#[cfg(feature = "pymbar")]
use crate::mbar::{InitialFreeEnergies, MBar};
#[cfg(feature = "pymbar")]
use numpy::PyArray;
#[cfg(feature = "pymbar")]
use pyo3::prelude::*;
#[cfg(feature = "pymbar")]
use pyo3::types::PyDict;

/// Anything that turns reduced potentials into free energy differences between their states
pub trait FepEstimator {
    /// Estimate free energy differences between every pair of states in `u_nk`
    fn fit(&self, u_nk: &UNk) -> Result<FreeEnergyDifferences>;
}

/// Dimensionless free energy differences between states, with uncertainties
#[derive(Debug, Clone, PartialEq)]
pub struct FreeEnergyDifferences {
    states: Vec<StateLabel>,
    delta_f: Array2<f64>,
    d_delta_f: Array2<f64>,
}

impl FreeEnergyDifferences {
    /// Label the matrices `delta_f` and `d_delta_f` with `states`; both must be K × K
    pub fn new(
        states: Vec<StateLabel>,
        delta_f: Array2<f64>,
        d_delta_f: Array2<f64>,
    ) -> Result<Self> {
        let k = states.len();
        for m in [&delta_f, &d_delta_f].iter() {
            if m.nrows() != k {
                return Err(FepError::ArrayLengthMismatch(m.nrows(), k));
            }
            if m.ncols() != k {
                return Err(FepError::ArrayLengthMismatch(m.ncols(), k));
            }
        }

        Ok(Self {
            states,
            delta_f,
            d_delta_f,
        })
    }

    /// State labels, in row and column order
    pub fn states(&self) -> &[StateLabel] {
        &self.states
    }

    /// `delta_f[[i, j]]` is the dimensionless free energy difference $f_j - f_i$
    pub fn delta_f(&self) -> &Array2<f64> {
        &self.delta_f
    }

    /// `d_delta_f[[i, j]]` is the uncertainty in $f_j - f_i$
    pub fn d_delta_f(&self) -> &Array2<f64> {
        &self.d_delta_f
    }

    /// $f_{to} - f_{from}$ and its uncertainty
    pub fn between(&self, from: &str, to: &str) -> Option<(f64, f64)> {
        let i = self.states.iter().position(|s| s == from)?;
        let j = self.states.iter().position(|s| s == to)?;
        Some((self.delta_f[[i, j]], self.d_delta_f[[i, j]]))
    }

    /// Difference between the first and the last state, and its uncertainty
    pub fn end_to_end(&self) -> Option<(f64, f64)> {
        let last = self.states.len().checked_sub(1)?;
        Some((self.delta_f[[0, last]], self.d_delta_f[[0, last]]))
    }
}

/// Work values between each pair of neighbouring states
///
/// Element `k` pairs states `k` and `k + 1` (in column order) and holds `(w_f, w_r)`: the
/// forward work `u[k + 1] - u[k]` of every row sampled at state `k`, and the reverse work
/// `u[k] - u[k + 1]` of every row sampled at state `k + 1`.
pub fn adjacent_work(u_nk: &UNk) -> Result<Vec<(Array1<f64>, Array1<f64>)>> {
    let groups = u_nk.state_groups()?;
    let values = u_nk.values();

    (0..u_nk.n_states())
        .tuple_windows()
        .map(|(k, l)| {
            for &s in &[k, l] {
                if groups[s].is_empty() {
                    return Err(FepError::EmptyState(u_nk.states()[s].to_string()));
                }
            }
            let w_f: Array1<f64> = groups[k]
                .iter()
                .map(|&n| values[[n, l]] - values[[n, k]])
                .collect();
            let w_r: Array1<f64> = groups[l]
                .iter()
                .map(|&n| values[[n, k]] - values[[n, l]])
                .collect();
            Ok((w_f, w_r))
        })
        .collect()
}

/// Chain neighbour estimates into full matrices
///
/// `steps[m]` is the free energy difference between states `m` and `m + 1` with its
/// uncertainty. Differences add along the chain and are antisymmetric; uncertainties add in
/// quadrature and are symmetric. Returns `(delta_f, d_delta_f)` for `steps.len() + 1` states.
pub fn accumulate_adjacent(steps: &[(f64, f64)]) -> (Array2<f64>, Array2<f64>) {
    let k = steps.len() + 1;
    let mut delta_f = Array2::zeros((k, k));
    let mut variance = Array2::<f64>::zeros((k, k));

    for i in 0..k {
        for j in (i + 1)..k {
            let df: f64 = steps[i..j].iter().map(|&(df, _)| df).sum();
            let var: f64 = steps[i..j].iter().map(|&(_, ddf)| ddf * ddf).sum();
            delta_f[[i, j]] = df;
            delta_f[[j, i]] = -df;
            variance[[i, j]] = var;
            variance[[j, i]] = var;
        }
    }

    (delta_f, variance.mapv(f64::sqrt))
}

/// Multistate Bennett acceptance ratio over all states at once
///
/// Rows are grouped by the state they were sampled from and handed to `pymbar.MBAR`.
#[cfg(feature = "pymbar")]
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(error = "FepError"))]
pub struct MbarEstimator {
    /// Set to limit the maximum number of iterations performed
    #[builder(default = "10000")]
    maximum_iterations: usize,

    /// Set to determine the relative tolerance convergence criteria
    #[builder(default = "1.0e-7")]
    relative_tolerance: f64,

    /// Set to the initial dimensionless free energies to use as a guess
    #[builder(default)]
    initial_free_energies: InitialFreeEnergies,

    /// Set to true if pymbar should print its progress
    #[builder(default = "false")]
    verbose: bool,
}

#[cfg(feature = "pymbar")]
impl MbarEstimator {
    /// Get a new builder for the `MbarEstimator` struct
    pub fn builder() -> MbarEstimatorBuilder {
        MbarEstimatorBuilder::default()
    }
}

#[cfg(feature = "pymbar")]
impl Default for MbarEstimator {
    fn default() -> Self {
        Self {
            maximum_iterations: 10000,
            relative_tolerance: 1.0e-7,
            initial_free_energies: InitialFreeEnergies::default(),
            verbose: false,
        }
    }
}

#[cfg(feature = "pymbar")]
impl FepEstimator for MbarEstimator {
    fn fit(&self, u_nk: &UNk) -> Result<FreeEnergyDifferences> {
        let (u_kn, n_k) = u_nk.u_kn()?;

        let mut builder = MBar::builder();
        builder
            .u_kn(u_kn)
            .n_k(n_k)
            .maximum_iterations(self.maximum_iterations)
            .relative_tolerance(self.relative_tolerance)
            .initial_free_energies(self.initial_free_energies.clone());
        let mbar = if self.verbose {
            builder.build_verbose()?
        } else {
            builder.build()?
        };

        let (delta_f, d_delta_f) = mbar.free_energy_differences()?;
        FreeEnergyDifferences::new(u_nk.states().to_vec(), delta_f, d_delta_f)
    }
}

/// Bennett acceptance ratio between neighbouring states
///
/// Each pair of neighbouring states (in column order) is solved with `pymbar.BAR`; the pair
/// estimates are then chained with [`accumulate_adjacent`]. Only neighbours need overlap, so
/// the order of the table's columns matters.
#[cfg(feature = "pymbar")]
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(error = "FepError"))]
pub struct BarEstimator {
    /// Set to limit the maximum number of iterations performed
    #[builder(default = "10000")]
    maximum_iterations: usize,

    /// Set to determine the relative tolerance convergence criteria
    #[builder(default = "1.0e-7")]
    relative_tolerance: f64,

    /// Root finding method passed to `pymbar.BAR`, either `"false-position"` or `"bisection"`
    #[builder(default = "String::from(\"false-position\")", setter(into))]
    method: String,

    /// Set to true if pymbar should print its progress
    #[builder(default = "false")]
    verbose: bool,
}

#[cfg(feature = "pymbar")]
impl BarEstimator {
    /// Get a new builder for the `BarEstimator` struct
    pub fn builder() -> BarEstimatorBuilder {
        BarEstimatorBuilder::default()
    }

    fn solve_pair(&self, w_f: &Array1<f64>, w_r: &Array1<f64>) -> Result<(f64, f64)> {
        Python::with_gil(|py| -> Result<(f64, f64)> {
            let bar = py.import("pymbar")?.getattr("BAR")?;
            let kwargs: &PyDict = PyDict::new(py);
            kwargs.set_item("method", &self.method)?;
            kwargs.set_item("maximum_iterations", self.maximum_iterations)?;
            kwargs.set_item("relative_tolerance", self.relative_tolerance)?;
            kwargs.set_item("verbose", self.verbose)?;

            let w_f: &PyAny = PyArray::from_array(py, w_f);
            let w_r: &PyAny = PyArray::from_array(py, w_r);
            let result = bar.call((w_f, w_r), Some(kwargs))?;
            Ok(result.extract::<(f64, f64)>()?)
        })
    }
}

#[cfg(feature = "pymbar")]
impl Default for BarEstimator {
    fn default() -> Self {
        Self {
            maximum_iterations: 10000,
            relative_tolerance: 1.0e-7,
            method: String::from("false-position"),
            verbose: false,
        }
    }
}

#[cfg(feature = "pymbar")]
impl FepEstimator for BarEstimator {
    fn fit(&self, u_nk: &UNk) -> Result<FreeEnergyDifferences> {
        let steps = adjacent_work(u_nk)?
            .iter()
            .map(|(w_f, w_r)| self.solve_pair(w_f, w_r))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("BAR over {} neighbouring pairs", steps.len());

        let (delta_f, d_delta_f) = accumulate_adjacent(&steps);
        FreeEnergyDifferences::new(u_nk.states().to_vec(), delta_f, d_delta_f)
    }
}

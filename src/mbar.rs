//! Thin wrapper around `pymbar.MBAR`.

use crate::errors::*;
use ndarray::{Array1, Array2, Axis};
use numpy::{PyArray, PyArray1, PyArray2};
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Define the initial guess for free energies
///
/// `InitialFreeEnergies::BAR` works best when the states are ordered such that adjacent states
/// maximize the overlap between states. It's up to the user to arrange the states in such an
/// order, or at least close to such an order. If you are uncertain what the order of states
/// should be, or if it does not make sense to think of states as adjacent, then choose
/// `InitialFreeEnergies::Zeros`.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialFreeEnergies {
    /// Use the specified free energy values
    Specified(Vec<f64>),
    /// Initialize all free energies to zero
    Zeros,
    /// Use BAR between the pairwise state to initialize the free energies.
    BAR,
}

impl Default for InitialFreeEnergies {
    fn default() -> Self {
        Self::Zeros
    }
}

impl From<&[f64]> for InitialFreeEnergies {
    fn from(slice: &[f64]) -> Self {
        Self::Specified(Vec::from(slice))
    }
}

/// Multistate Bennett acceptance ratio method (MBAR) for the analysis of multiple equilibrium
/// samples.
///
/// # Notes
///
/// Note that this method assumes the data are uncorrelated.
///
/// Correlated data must be subsampled to extract uncorrelated (effectively independent) samples.
///
/// # References
///
/// 1. Shirts MR and Chodera JD. Statistically optimal analysis of samples from multiple
/// equilibrium states. J. Chem. Phys. 129:124105, 2008 <http://dx.doi.org/10.1063/1.2978177>
#[derive(Builder, Debug)]
#[builder(build_fn(
    validate = "Self::validate",
    name = "build_inner",
    private,
    error = "FepError"
))]
pub struct MBar {
    /// `u_kn[k][n]` is the reduced potential energy of configuration n evaluated at state `k`
    u_kn: Array2<f64>,

    /// `n_k[k]` is the number of uncorrelated snapshots sampled from state `k`
    ///
    /// The samples in `u_kn` are ordered such that the first `n_k[0]` are from the first
    /// state, the next `n_k[1]` from the second state, and so forth.
    n_k: Array1<usize>,

    /// Set to limit the maximum number of iterations performed
    #[builder(default = "1000")]
    maximum_iterations: usize,

    /// Set to determine the relative tolerance convergence criteria
    #[builder(default = "1.0e-6")]
    relative_tolerance: f64,

    /// Set to the initial dimensionless free energies to use as a guess
    #[builder(default)]
    initial_free_energies: InitialFreeEnergies,

    /// Set to True if verbose debug output is desired
    #[builder(setter(skip), default = "false")]
    verbose: bool,

    /// Pointer to the MBAR object on Python's heap
    ///
    /// After Self is built, this should always be a valid pointer to an MBAR object. This is
    /// enforced by it being a private field and MBar structs only being constructable via the
    /// builder pattern.
    #[builder(setter(skip), default = "Python::with_gil(|py| py.None())")]
    mbar_obj: PyObject,
}

impl MBarBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let (Some(u_kn), Some(n_k)) = (&self.u_kn, &self.n_k) {
            let k = u_kn.len_of(Axis(0));
            let n_tot = u_kn.len_of(Axis(1));

            if n_tot != n_k.iter().sum::<usize>() {
                return Err(format!(
                    "n_k.sum() must equal the total number of samples ({})",
                    n_tot
                ));
            }

            if k != n_k.len() {
                return Err(format!(
                    "n_k's length must equal the number of states ({})",
                    k
                ));
            }
        }

        Ok(())
    }

    /// Build and initialise the MBAR implementation and print progress to STDOUT
    pub fn build_verbose(&self) -> Result<MBar> {
        let mut new = self.build_inner()?;
        new.verbose = true;
        new.init()
    }

    /// Build and initialise the MBAR implementation
    pub fn build(&self) -> Result<MBar> {
        let mut new = self.build_inner()?;
        new.verbose = false;
        new.init()
    }
}

impl MBar {
    /// Initialise the MBAR in Python; called by build methods
    fn init(mut self) -> Result<Self> {
        Python::with_gil(|py| -> Result<Self> {
            let mbar = py.import("pymbar")?.getattr("MBAR")?;
            let kwargs: &PyDict = PyDict::new(py);
            kwargs.set_item("u_kn", PyArray::from_array(py, &self.u_kn))?;
            kwargs.set_item(
                "N_k",
                PyArray1::from_vec(py, self.n_k.iter().map(|&n| n as i64).collect()),
            )?;
            kwargs.set_item("maximum_iterations", self.maximum_iterations)?;
            kwargs.set_item("relative_tolerance", self.relative_tolerance)?;
            kwargs.set_item("verbose", self.verbose)?;

            match &self.initial_free_energies {
                InitialFreeEnergies::Specified(energies) => {
                    if energies.len() != self.k() {
                        return Err(FepError::ArrayLengthMismatch(energies.len(), self.k()));
                    }
                    kwargs.set_item("initial_f_k", PyArray1::from_slice(py, energies))?;
                }
                InitialFreeEnergies::Zeros => {
                    kwargs.set_item("initialize", "zeros")?;
                }
                InitialFreeEnergies::BAR => {
                    kwargs.set_item("initialize", "BAR")?;
                }
            }

            log::debug!(
                "initialising pymbar.MBAR with {} states and {} samples",
                self.k(),
                self.n_tot()
            );
            self.mbar_obj = mbar.call((), Some(kwargs))?.into_py(py);
            Ok(self)
        })
    }

    /// Get a new builder for the `MBar` struct. `MBar` can only be constructed via the builder.
    pub fn builder() -> MBarBuilder {
        MBarBuilder::default()
    }

    /// $N_{tot}$, the total number of snapshots from all states
    pub fn n_tot(&self) -> usize {
        self.u_kn.len_of(Axis(1))
    }

    /// $K$, the total number of thermodynamic states
    pub fn k(&self) -> usize {
        self.u_kn.len_of(Axis(0))
    }

    /// `u_kn[k][n]` is the reduced potential energy of configuration n evaluated at state `k`
    pub fn u_kn(&self) -> &Array2<f64> {
        &self.u_kn
    }

    /// `n_k[k]` is the number of uncorrelated snapshots sampled from state `k`
    pub fn n_k(&self) -> &Array1<usize> {
        &self.n_k
    }

    /// Retrieve a copy of the relative dimensionless free energy $f_k$ of states $k$
    pub fn f_k(&self) -> Result<Array1<f64>> {
        Python::with_gil(|py| -> Result<Array1<f64>> {
            Ok(self
                .mbar_obj
                .as_ref(py)
                .getattr("f_k")?
                .extract::<&PyArray1<f64>>()?
                .to_owned_array())
        })
    }

    /// Get the dimensionless free energy differences and uncertainties among all states
    ///
    /// Returns `(delta_f, d_delta_f)`, where `delta_f[[i, j]]` is $f_j - f_i$ and
    /// `d_delta_f[[i, j]]` is its estimated statistical uncertainty (one standard deviation).
    pub fn free_energy_differences(&self) -> Result<(Array2<f64>, Array2<f64>)> {
        Python::with_gil(|py| -> Result<(Array2<f64>, Array2<f64>)> {
            let kwargs: &PyDict = PyDict::new(py);
            kwargs.set_item("compute_uncertainty", true)?;
            kwargs.set_item("return_dict", true)?;

            let pydict = self.mbar_obj.as_ref(py).call_method(
                "getFreeEnergyDifferences",
                (),
                Some(kwargs),
            )?;

            let delta_f = pydict
                .get_item("Delta_f")?
                .extract::<&PyArray2<f64>>()?
                .to_owned_array();
            let d_delta_f = pydict
                .get_item("dDelta_f")?
                .extract::<&PyArray2<f64>>()?
                .to_owned_array();
            Ok((delta_f, d_delta_f))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn u_kn() -> Array2<f64> {
        array![
            [1.4, 2.3, 3.7, 4.1, 7.7, 9.1],
            [-1.6, -2.3, 9.7, 34.1, 27.7, 19.1],
            [4.4, 7.3, 9.7, 8.1, 4.7, 3.1],
        ]
    }

    #[test]
    fn build_mbar() {
        let mbar = MBar::builder()
            .u_kn(u_kn())
            .n_k(array![2, 2, 2])
            .build_inner()
            .unwrap();

        assert_eq!(mbar.u_kn(), &u_kn());
        assert_eq!(mbar.n_k(), &array![2, 2, 2]);
        assert_eq!(mbar.k(), 3);
        assert_eq!(mbar.n_tot(), 6);
        assert_eq!(mbar.maximum_iterations, 1000);
        assert_eq!(mbar.relative_tolerance, 1.0e-6);
        assert!(!mbar.verbose);
        assert_eq!(mbar.initial_free_energies, InitialFreeEnergies::Zeros);
    }

    #[test]
    fn validate_sample_counts() {
        let err = MBar::builder()
            .u_kn(u_kn())
            .n_k(array![2, 2, 1])
            .build_inner()
            .unwrap_err();
        assert!(matches!(err, FepError::BuilderError(_)));

        let err = MBar::builder()
            .u_kn(u_kn())
            .n_k(array![3, 3])
            .build_inner()
            .unwrap_err();
        assert!(matches!(err, FepError::BuilderError(_)));
    }

    #[test]
    fn missing_field_is_builder_error() {
        let err = MBar::builder().u_kn(u_kn()).build_inner().unwrap_err();
        assert!(matches!(err, FepError::BuilderError(_)));
    }

    #[test]
    #[ignore = "requires a Python environment with pymbar"]
    fn init_mbar() {
        let mbar = MBar::builder()
            .u_kn(u_kn())
            .n_k(array![2, 2, 2])
            .build()
            .unwrap();

        let (delta_f, d_delta_f) = mbar.free_energy_differences().unwrap();
        assert_eq!(delta_f.dim(), (3, 3));
        assert_eq!(d_delta_f.dim(), (3, 3));
        assert_eq!(mbar.f_k().unwrap().len(), 3);
    }
}

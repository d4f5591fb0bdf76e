//! Sparse accumulation of windows into a table.

use crate::state::StateLabel;
use crate::table::{RowKey, UNk};
use crate::window::Window;
use ndarray::Array2;
use std::collections::HashMap;

/// Sparse accumulator of reduced potentials
///
/// Rows and columns are created on demand as windows are folded in. Only cells a window
/// actually sets are stored; every other cell reads as zero. The dense [`UNk`] is built once,
/// by [`SparseStateMatrix::finalize`].
#[derive(Debug, Default)]
pub struct SparseStateMatrix {
    states: Vec<StateLabel>,
    columns: HashMap<StateLabel, usize>,
    rows: Vec<RowKey>,
    cells: HashMap<(usize, usize), f64>,
}

impl SparseStateMatrix {
    /// A matrix with no rows and no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Column of `state`, created if this is the first time the state is seen
    pub fn column(&mut self, state: &StateLabel) -> usize {
        if let Some(&k) = self.columns.get(state) {
            return k;
        }
        let k = self.states.len();
        self.states.push(state.clone());
        self.columns.insert(state.clone(), k);
        k
    }

    /// Add one row per frame of `window`
    ///
    /// Rows are keyed by the sampled state. The evaluated state's column gets the frame's energy
    /// difference; the sampled state's own column stays at zero. Both states become columns even
    /// if the window has no frames.
    pub fn fold_window(&mut self, window: &Window) {
        self.column(&window.sampled);
        let evaluated = self.column(&window.evaluated);

        for (timestep, energy_diff) in window.frames() {
            let n = self.push_row(timestep, &window.sampled);
            self.cells.insert((n, evaluated), energy_diff);
        }
    }

    /// Add one all-zero row per timestep, keyed by `state`
    pub fn push_zero_rows(&mut self, state: &StateLabel, timesteps: &[f64]) {
        self.column(state);
        for &timestep in timesteps {
            self.push_row(timestep, state);
        }
    }

    fn push_row(&mut self, timestep: f64, state: &StateLabel) -> usize {
        self.rows.push(RowKey::new(timestep, state.clone()));
        self.rows.len() - 1
    }

    /// Number of rows added so far
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns created so far
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    /// Value of a cell; zero unless a window set it
    pub fn get(&self, n: usize, k: usize) -> f64 {
        self.cells.get(&(n, k)).copied().unwrap_or(0.0)
    }

    /// Materialize the dense table
    pub fn finalize(self) -> UNk {
        let mut values = Array2::zeros((self.rows.len(), self.states.len()));
        for (&(n, k), &u) in &self.cells {
            values[[n, k]] = u;
        }

        UNk::from_parts(self.rows, self.states, values)
    }
}

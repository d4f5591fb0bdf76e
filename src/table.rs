//! The normalized table of reduced potentials.

use crate::errors::*;
use crate::state::StateLabel;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashMap;

/// Index entry of a row: which frame, sampled from which state
#[derive(Debug, Clone, PartialEq)]
pub struct RowKey {
    /// Simulation step of the frame
    pub timestep: f64,
    /// State the frame was sampled from
    pub state: StateLabel,
}

impl RowKey {
    /// Key for the frame at `timestep` sampled from `state`
    pub fn new(timestep: f64, state: StateLabel) -> Self {
        Self { timestep, state }
    }
}

/// Reduced potentials `u_nk`
///
/// Row `n` is one frame, indexed by a [`RowKey`]; column `k` is one alchemical state. The cell
/// holds the reduced potential of frame `n` evaluated at state `k`, relative to the state it
/// was sampled from. Rows keep the order they were read in, and the same key may appear more
/// than once when a state is revisited.
#[derive(Debug, Clone, PartialEq)]
pub struct UNk {
    index: Vec<RowKey>,
    states: Vec<StateLabel>,
    values: Array2<f64>,
}

impl UNk {
    /// Assemble a table from its parts
    ///
    /// `values` must have one row per index entry and one column per state.
    pub fn new(index: Vec<RowKey>, states: Vec<StateLabel>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != index.len() {
            return Err(FepError::ArrayLengthMismatch(values.nrows(), index.len()));
        }
        if values.ncols() != states.len() {
            return Err(FepError::ArrayLengthMismatch(values.ncols(), states.len()));
        }

        Ok(Self {
            index,
            states,
            values,
        })
    }

    pub(crate) fn from_parts(
        index: Vec<RowKey>,
        states: Vec<StateLabel>,
        values: Array2<f64>,
    ) -> Self {
        debug_assert_eq!(values.dim(), (index.len(), states.len()));
        Self {
            index,
            states,
            values,
        }
    }

    /// Stack tables row-wise, e.g. tables parsed from the windows of separate files
    ///
    /// States are joined by label. Columns appear in order of first appearance; a table that
    /// lacks one of the joined states contributes zeros to that column.
    pub fn concat(tables: &[UNk]) -> Self {
        let mut states: Vec<StateLabel> = Vec::new();
        let mut columns: HashMap<StateLabel, usize> = HashMap::new();
        for state in tables.iter().flat_map(|t| t.states.iter()) {
            if !columns.contains_key(state) {
                columns.insert(state.clone(), states.len());
                states.push(state.clone());
            }
        }

        let n_rows = tables.iter().map(UNk::n_rows).sum();
        let mut index = Vec::with_capacity(n_rows);
        let mut values = Array2::zeros((n_rows, states.len()));
        for table in tables {
            let offset = index.len();
            index.extend(table.index.iter().cloned());
            for (k, state) in table.states.iter().enumerate() {
                let target = columns[state];
                for (n, &u) in table.values.column(k).iter().enumerate() {
                    values[[offset + n, target]] = u;
                }
            }
        }

        Self {
            index,
            states,
            values,
        }
    }

    /// $N$, the number of rows
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// $K$, the number of states
    pub fn n_states(&self) -> usize {
        self.states.len()
    }

    /// Does the table have no rows?
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Row keys, in row order
    pub fn index(&self) -> &[RowKey] {
        &self.index
    }

    /// State labels, in column order
    pub fn states(&self) -> &[StateLabel] {
        &self.states
    }

    /// `values[[n, k]]` is the reduced potential of row `n` at state `k`
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Column position of a state
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// Reduced potentials of every row at `state`
    pub fn column(&self, state: &str) -> Option<ArrayView1<'_, f64>> {
        self.state_index(state).map(|k| self.values.column(k))
    }

    /// Reduced potentials of row `n` at every state
    pub fn row(&self, n: usize) -> Option<ArrayView1<'_, f64>> {
        if n < self.n_rows() {
            Some(self.values.row(n))
        } else {
            None
        }
    }

    /// Positions of all rows keyed by `(timestep, state)`, in row order
    pub fn locate(&self, timestep: f64, state: &str) -> Vec<usize> {
        self.index
            .iter()
            .enumerate()
            .filter(|(_, key)| key.timestep == timestep && key.state == state)
            .map(|(n, _)| n)
            .collect()
    }

    /// Value at `column` for the first row keyed by `(timestep, state)`
    pub fn get(&self, timestep: f64, state: &str, column: &str) -> Option<f64> {
        let k = self.state_index(column)?;
        let n = *self.locate(timestep, state).first()?;
        Some(self.values[[n, k]])
    }

    /// Row positions sampled from each state, one group per column, in row order
    pub fn state_groups(&self) -> Result<Vec<Vec<usize>>> {
        let columns: HashMap<&StateLabel, usize> =
            self.states.iter().enumerate().map(|(k, s)| (s, k)).collect();

        let mut groups = vec![Vec::new(); self.n_states()];
        for (n, key) in self.index.iter().enumerate() {
            let k = columns
                .get(&key.state)
                .ok_or_else(|| FepError::UnknownState(key.state.to_string()))?;
            groups[*k].push(n);
        }
        Ok(groups)
    }

    /// `n_k[k]` is the number of rows sampled from state `k`
    pub fn samples_per_state(&self) -> Result<Array1<usize>> {
        Ok(self.state_groups()?.iter().map(Vec::len).collect())
    }

    /// The table as a $K \times N$ matrix with samples grouped by state
    ///
    /// Returns `(u_kn, n_k)`: `u_kn[[k, n]]` is the reduced potential of sample `n` at state `k`,
    /// where the first `n_k[0]` samples come from state 0, the next `n_k[1]` from state 1 and
    /// so forth. This is the input MBAR expects.
    pub fn u_kn(&self) -> Result<(Array2<f64>, Array1<usize>)> {
        let groups = self.state_groups()?;
        let n_k: Array1<usize> = groups.iter().map(Vec::len).collect();
        let order: Vec<usize> = groups.into_iter().flatten().collect();

        let u_kn = Array2::from_shape_fn((self.n_states(), order.len()), |(k, n)| {
            self.values[[order[n], k]]
        });
        Ok((u_kn, n_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn label(v: f64) -> StateLabel {
        StateLabel::from_value(v)
    }

    fn two_state_table() -> UNk {
        UNk::new(
            vec![
                RowKey::new(0.0, label(0.0)),
                RowKey::new(10.0, label(0.0)),
                RowKey::new(0.0, label(1.0)),
            ],
            vec![label(0.0), label(1.0)],
            array![[0.0, 1.5], [0.0, 2.5], [-1.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn new_checks_shape() {
        let err = UNk::new(
            vec![RowKey::new(0.0, label(0.0))],
            vec![label(0.0)],
            Array2::zeros((2, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, FepError::ArrayLengthMismatch(2, 1)));
    }

    #[test]
    fn lookup_by_key() {
        let u_nk = two_state_table();
        assert_eq!(u_nk.get(10.0, "0.00", "1.00"), Some(2.5));
        assert_eq!(u_nk.get(0.0, "1.00", "0.00"), Some(-1.0));
        assert_eq!(u_nk.get(5.0, "0.00", "1.00"), None);
        assert_eq!(u_nk.get(0.0, "0.00", "0.50"), None);
        assert_eq!(u_nk.locate(0.0, "0.00"), vec![0]);
        assert_eq!(u_nk.column("1.00").unwrap().to_vec(), vec![1.5, 2.5, 0.0]);
        assert!(u_nk.row(3).is_none());
    }

    #[test]
    fn u_kn_groups_samples_by_state() {
        let u_nk = UNk::new(
            vec![
                RowKey::new(0.0, label(1.0)),
                RowKey::new(0.0, label(0.0)),
                RowKey::new(10.0, label(1.0)),
            ],
            vec![label(0.0), label(1.0)],
            array![[-1.0, 0.0], [0.0, 1.5], [-2.0, 0.0]],
        )
        .unwrap();

        let (u_kn, n_k) = u_nk.u_kn().unwrap();
        assert_eq!(n_k, array![1, 2]);
        assert_eq!(u_kn, array![[0.0, -1.0, -2.0], [1.5, 0.0, 0.0]]);
    }

    #[test]
    fn unknown_row_state_is_an_error() {
        let u_nk = UNk::new(
            vec![RowKey::new(0.0, label(0.5))],
            vec![label(0.0)],
            Array2::zeros((1, 1)),
        )
        .unwrap();
        assert!(matches!(u_nk.u_kn(), Err(FepError::UnknownState(s)) if s == "0.50"));
    }

    #[test]
    fn concat_joins_states_and_fills_zero() {
        let first = two_state_table();
        let second = UNk::new(
            vec![RowKey::new(0.0, label(0.5))],
            vec![label(0.5), label(1.0)],
            array![[0.0, 3.0]],
        )
        .unwrap();

        let joined = UNk::concat(&[first, second]);
        assert_eq!(joined.states(), &[label(0.0), label(1.0), label(0.5)]);
        assert_eq!(joined.n_rows(), 4);
        assert_eq!(joined.row(3).unwrap().to_vec(), vec![0.0, 3.0, 0.0]);
        assert_eq!(joined.column("0.50").unwrap().to_vec(), vec![0.0; 4]);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let u_nk = UNk::concat(&[]);
        assert!(u_nk.is_empty());
        assert_eq!(u_nk.n_states(), 0);
        assert_eq!(u_nk.samples_per_state().unwrap().len(), 0);
    }
}

//! Frames collected within one window.

use crate::state::StateLabel;

/// A closed window: frames sampled at one state and evaluated at another
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// State the frames were sampled from
    pub sampled: StateLabel,
    /// State the frames were re-evaluated at
    pub evaluated: StateLabel,
    timesteps: Vec<f64>,
    energies: Vec<f64>,
}

impl Window {
    /// `timesteps[n]` is the simulation step of frame `n`
    pub fn timesteps(&self) -> &[f64] {
        &self.timesteps
    }

    /// `energies[n]` is the energy difference of frame `n`
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Iterate over `(timestep, energy difference)` pairs in input order
    pub fn frames(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.timesteps.iter().copied().zip(self.energies.iter().copied())
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    /// Was the window closed without frames?
    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    /// Give up the frame data, keeping only the timesteps
    pub fn into_timesteps(self) -> Vec<f64> {
        self.timesteps
    }
}

/// Accumulates the frames of the window currently being recorded
///
/// Timesteps and energies are kept as two parallel vectors that always have the same length.
#[derive(Debug, Default)]
pub struct WindowRecordBuilder {
    timesteps: Vec<f64>,
    energies: Vec<f64>,
}

impl WindowRecordBuilder {
    /// A builder with no frames
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame
    pub fn push(&mut self, timestep: f64, energy_diff: f64) {
        self.timesteps.push(timestep);
        self.energies.push(energy_diff);
    }

    /// Forget any frames recorded so far
    pub fn clear(&mut self) {
        self.timesteps.clear();
        self.energies.clear();
    }

    /// Number of frames recorded so far
    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    /// Have no frames been recorded since the last reset?
    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    /// Close the window under the given labels, leaving the builder empty
    pub fn finish(&mut self, sampled: StateLabel, evaluated: StateLabel) -> Window {
        Window {
            sampled,
            evaluated,
            timesteps: std::mem::take(&mut self.timesteps),
            energies: std::mem::take(&mut self.energies),
        }
    }
}

//! Splitting a FEP log into windows.
//!
//! The segmenter is a two-state machine fed one line at a time. It knows nothing about
//! tables; it only reports what each line means as a [`WindowEvent`].

use crate::errors::*;
use crate::state::StateLabel;

/// Token that starts the collection of samples for a window
pub const START_MARKER: &str = "#STARTING";

/// Token that closes a window with its free energy summary
pub const SUMMARY_MARKER: &str = "#Free";

const TIMESTEP_FIELD: usize = 1;
const ENERGY_FIELD: usize = 6;
const SAMPLED_FIELD: usize = 7;
const EVALUATED_FIELD: usize = 8;

/// Where the segmenter is in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Outside a collection block; non-marker lines are ignored
    Idle,
    /// Inside a collection block; non-marker lines are frames
    Recording {
        /// Line of the start marker that opened this block
        opened_at: usize,
    },
}

impl Default for SegmenterState {
    fn default() -> Self {
        Self::Idle
    }
}

/// What a single line of the log means
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// Sample collection begins
    WindowStart,
    /// One frame of the current window
    FrameObserved {
        /// Simulation step of the frame
        timestep: f64,
        /// Energy difference between the evaluated and the sampled state
        energy_diff: f64,
    },
    /// The window is complete
    WindowEnd {
        /// State the frames were sampled from
        sampled: StateLabel,
        /// State the frames were re-evaluated at
        evaluated: StateLabel,
    },
}

/// Line-by-line window detector
#[derive(Debug, Default)]
pub struct Segmenter {
    state: SegmenterState,
    line: usize,
}

impl Segmenter {
    /// A segmenter that has not seen any line yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; `Recording` after the last line means the final window was never closed
    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Number of lines fed so far
    pub fn lines_seen(&self) -> usize {
        self.line
    }

    /// Interpret the next line of the log
    ///
    /// Summary lines close the window whatever the current state. Start lines open one, and
    /// restart it if one was already open. Any other line is a frame while recording and
    /// noise otherwise.
    pub fn feed(&mut self, line: &str) -> Result<Option<WindowEvent>> {
        self.line += 1;
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.contains(&SUMMARY_MARKER) {
            let sampled = StateLabel::from_value(self.number(&fields, SAMPLED_FIELD)?);
            let evaluated = StateLabel::from_value(self.number(&fields, EVALUATED_FIELD)?);
            self.state = SegmenterState::Idle;
            return Ok(Some(WindowEvent::WindowEnd { sampled, evaluated }));
        }

        if fields.contains(&START_MARKER) {
            if let SegmenterState::Recording { opened_at } = self.state {
                log::warn!(
                    "line {}: sample collection restarted, dropping frames recorded since line {}",
                    self.line,
                    opened_at
                );
            }
            self.state = SegmenterState::Recording { opened_at: self.line };
            return Ok(Some(WindowEvent::WindowStart));
        }

        match self.state {
            SegmenterState::Idle => Ok(None),
            SegmenterState::Recording { .. } => Ok(Some(WindowEvent::FrameObserved {
                timestep: self.number(&fields, TIMESTEP_FIELD)?,
                energy_diff: self.number(&fields, ENERGY_FIELD)?,
            })),
        }
    }

    fn number(&self, fields: &[&str], field: usize) -> Result<f64> {
        let token = fields.get(field).ok_or_else(|| FepError::FormatViolation {
            line: self.line,
            field,
            found: None,
        })?;

        token.parse().map_err(|_| FepError::FormatViolation {
            line: self.line,
            field,
            found: Some(token.to_string()),
        })
    }
}

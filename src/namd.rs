//! Reduced potentials from NAMD FEP output (`.fepout`) files.
//!
//! A `.fepout` file is a sequence of windows. Each window reports an equilibration phase,
//! then a `#STARTING COLLECTION OF ENSEMBLE AVERAGE` line, then one `FepEnergy:` line per
//! frame, and ends with a `#Free energy change for lambda window [ l1 l2 ] ...` summary.
//! Frames of a window are sampled at `l1` and their energy difference is evaluated at `l2`.
//!
//! ```no_run
//! use alchem_rs::namd::{extract_u_nk_with, NamdOptions, OpenWindowPolicy};
//!
//! let options = NamdOptions::builder()
//!     .open_window(OpenWindowPolicy::Error)
//!     .build()?;
//! let u_nk = extract_u_nk_with("forward.fepout", &options)?;
//! println!("{} frames over {} states", u_nk.n_rows(), u_nk.n_states());
//! # Ok::<(), alchem_rs::FepError>(())
//! ```

use crate::errors::*;
use crate::matrix::SparseStateMatrix;
use crate::segmenter::{Segmenter, SegmenterState, WindowEvent};
use crate::state::StateLabel;
use crate::table::UNk;
use crate::window::WindowRecordBuilder;
use std::fs;
use std::io::Read;
use std::path::Path;

/// What to do with frames of a window that the file never closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenWindowPolicy {
    /// Drop its frames and log a warning
    Discard,
    /// Fail with [`FepError::OpenWindow`]
    Error,
}

impl Default for OpenWindowPolicy {
    fn default() -> Self {
        Self::Discard
    }
}

/// Parser options
#[derive(Builder, Debug, Clone)]
#[builder(build_fn(error = "FepError"))]
pub struct NamdOptions {
    /// Append an all-zero row group for the last evaluated state
    ///
    /// The group repeats the timesteps of the last window, keyed by the state that window was
    /// evaluated at. Tables produced this way match historical `u_nk` output and give the
    /// final state samples for the estimators. Defaults to `true`.
    #[builder(default = "true")]
    trailing_group: bool,

    /// Handling of a window still open at the end of the file. Defaults to discarding it.
    #[builder(default)]
    open_window: OpenWindowPolicy,
}

impl Default for NamdOptions {
    fn default() -> Self {
        Self {
            trailing_group: true,
            open_window: OpenWindowPolicy::default(),
        }
    }
}

impl NamdOptions {
    /// Get a new builder for the `NamdOptions` struct
    pub fn builder() -> NamdOptionsBuilder {
        NamdOptionsBuilder::default()
    }

    /// Is the trailing all-zero row group appended?
    pub fn trailing_group(&self) -> bool {
        self.trailing_group
    }

    /// Handling of a window still open at the end of the file
    pub fn open_window(&self) -> OpenWindowPolicy {
        self.open_window
    }
}

/// Folds window events into the sparse matrix
#[derive(Debug, Default)]
struct Assembler {
    frames: WindowRecordBuilder,
    matrix: SparseStateMatrix,
    // evaluated state and timesteps of the last closed window
    last: Option<(StateLabel, Vec<f64>)>,
    windows: usize,
}

impl Assembler {
    fn apply(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::WindowStart => self.frames.clear(),
            WindowEvent::FrameObserved {
                timestep,
                energy_diff,
            } => self.frames.push(timestep, energy_diff),
            WindowEvent::WindowEnd { sampled, evaluated } => {
                let window = self.frames.finish(sampled, evaluated);
                log::debug!(
                    "window {} -> {}: {} frames",
                    window.sampled,
                    window.evaluated,
                    window.len()
                );
                self.matrix.fold_window(&window);
                self.windows += 1;
                self.last = Some((window.evaluated.clone(), window.into_timesteps()));
            }
        }
    }

    fn finish(mut self, trailing_group: bool) -> Result<UNk> {
        let (state, timesteps) = self.last.take().ok_or(FepError::NoData)?;
        if trailing_group {
            self.matrix.push_zero_rows(&state, &timesteps);
        }
        Ok(self.matrix.finalize())
    }
}

/// Parse `u_nk` from the text of a `.fepout` file
///
/// Fails with [`FepError::FormatViolation`] on the first frame or summary line that lacks a
/// number where one is expected, and with [`FepError::NoData`] if the text holds no window.
pub fn parse_u_nk(text: &str, options: &NamdOptions) -> Result<UNk> {
    let mut segmenter = Segmenter::new();
    let mut assembler = Assembler::default();

    for line in text.lines() {
        if let Some(event) = segmenter.feed(line)? {
            assembler.apply(event);
        }
    }

    if let SegmenterState::Recording { opened_at } = segmenter.state() {
        match options.open_window {
            OpenWindowPolicy::Error => return Err(FepError::OpenWindow { line: opened_at }),
            OpenWindowPolicy::Discard => log::warn!(
                "window opened at line {} was never closed; discarding its {} frames",
                opened_at,
                assembler.frames.len()
            ),
        }
    }

    let windows = assembler.windows;
    let u_nk = assembler.finish(options.trailing_group)?;
    log::info!(
        "parsed {} windows from {} lines into {} rows over {} states",
        windows,
        segmenter.lines_seen(),
        u_nk.n_rows(),
        u_nk.n_states()
    );
    Ok(u_nk)
}

/// Parse `u_nk` from a reader, e.g. a decompressing one
///
/// The whole input is read before parsing starts.
pub fn read_u_nk<R: Read>(mut reader: R, options: &NamdOptions) -> Result<UNk> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_u_nk(&text, options)
}

/// Parse `u_nk` from a `.fepout` file with default options
pub fn extract_u_nk<P: AsRef<Path>>(fep_file: P) -> Result<UNk> {
    extract_u_nk_with(fep_file, &NamdOptions::default())
}

/// Parse `u_nk` from a `.fepout` file
pub fn extract_u_nk_with<P: AsRef<Path>>(fep_file: P, options: &NamdOptions) -> Result<UNk> {
    let fep_file = fep_file.as_ref();
    log::debug!("reading {}", fep_file.display());
    let text = fs::read_to_string(fep_file)?;
    parse_u_nk(&text, options)
}

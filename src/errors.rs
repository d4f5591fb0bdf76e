//! Errors produced while parsing and estimating.

#[cfg(feature = "pymbar")]
use pyo3::prelude::PyErr;
use thiserror::Error;

/// Enum for errors in this crate
#[derive(Error, Debug)]
pub enum FepError {
    /// Error returned when a builder was called improperly
    #[error("Could not build: {0}")]
    BuilderError(String),

    /// Error returned when a line does not carry a number where the format requires one
    #[error("Line {line}: expected a number in field {field}, found {}", .found.as_deref().unwrap_or("nothing"))]
    FormatViolation {
        /// 1-based line number in the input
        line: usize,
        /// 0-based whitespace-delimited field index
        field: usize,
        /// The offending token, if the field was present at all
        found: Option<String>,
    },

    /// Error returned when the input contains no complete window
    #[error("No FEP windows found in input")]
    NoData,

    /// Error returned when the input ends inside a window
    #[error("Window opened at line {line} was never closed by a free energy summary")]
    OpenWindow {
        /// Line of the start marker that opened the window
        line: usize,
    },

    /// Error returned when the input could not be read
    #[error("Could not read input: {0}")]
    Io(#[from] std::io::Error),

    /// Error returned when an array is the wrong length
    #[error("Array of length {0} is incorrect; length should be {1}")]
    ArrayLengthMismatch(usize, usize),

    /// Error returned when a row is keyed by a state that has no column
    #[error("State {0} has no column in the table")]
    UnknownState(String),

    /// Error returned when a state needed by an estimator has no samples
    #[error("State {0} has no samples")]
    EmptyState(String),

    /// Error returned when a python exception is not handled
    #[cfg(feature = "pymbar")]
    #[error("Unexpected Python exception was not handled")]
    UnhandledPythonException {
        #[allow(missing_docs)]
        #[from]
        source: PyErr,
    },
}

impl From<String> for FepError {
    fn from(s: String) -> Self {
        Self::BuilderError(s)
    }
}

impl From<derive_builder::UninitializedFieldError> for FepError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        Self::BuilderError(e.to_string())
    }
}

/// Result type for the alchem-rs crate
pub type Result<T> = std::result::Result<T, FepError>;

//! # Error Module
//!
//! Typed failures for the calibration core. Everything is returned
//! synchronously to the immediate caller; the GUI turns these into
//! empty or explanatory read-outs.

use thiserror::Error;

/// Failures of polynomial construction, fitting and root finding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// A polynomial needs at least one coefficient.
    #[error("a polynomial needs at least one coefficient")]
    EmptyCoefficients,

    /// The x and y sequences have different lengths.
    #[error("x and y must have the same length (got {xs} and {ys})")]
    LengthMismatch { xs: usize, ys: usize },

    /// A sample coordinate is NaN or infinite.
    #[error("sample {index} is not a finite number ({value})")]
    InvalidInput { index: usize, value: f64 },

    /// Not enough independent points to determine a polynomial of this degree.
    #[error("insufficient data for requested degree: {points} usable points for degree {degree}")]
    UnderdeterminedFit { points: usize, degree: usize },

    /// The linear algebra backend could not produce a solution.
    #[error("numerical solver failed: {0}")]
    SolverFailed(String),
}

/// Failures while reading a preset source library.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not read source library: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed source library: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown source '{0}'")]
    UnknownSource(String),
}

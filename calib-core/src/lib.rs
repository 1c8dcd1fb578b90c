// calib-core/src/lib.rs

//! The core logic for the energy calibrator.
//! This crate fits channel→energy polynomials, converts in both
//! directions, and keeps the state of a calibration session. It is
//! completely headless and contains no GUI code.

pub mod error;
pub mod points;
pub mod polynomial;
pub mod session;
pub mod sources;

pub use error::{FitError, SourceError};
pub use points::{Column, PointRow, SamplePoint};
pub use polynomial::Polynomial;
pub use session::CalibrationSession;
pub use sources::{SourceLibrary, SourcePreset};

//! # Widgets Module
//!
//! Custom canvas widgets used by the calibrator window.

pub mod curve_plot;

//! # UI Module
//!
//! This module contains the window layout of the energy calibrator.

pub mod main_display;

//! # Calibration Session Module
//!
//! Headless state behind the calibrator window: the point table, the
//! requested degree, the current fit and the two conversion read-outs.
//! The GUI forwards every edit here and renders whatever text comes back,
//! so all of the behaviour is testable without a window.

use log::{debug, warn};

use crate::error::FitError;
use crate::points::{collect_points, Column, PointRow, PointSet};
use crate::polynomial::Polynomial;
use crate::sources::SourcePreset;

/// Label of the independent variable in the fitted polynomial.
pub const CHANNEL_LABEL: &str = "Chan";
/// Label of the dependent variable in the fitted polynomial.
pub const ENERGY_LABEL: &str = "Energy";
/// Degree requested by a fresh session.
pub const DEFAULT_DEGREE: &str = "1";

const NO_REAL_ROOTS: &str = "No real roots";

/// Everything the calibrator window shows, minus the widgets.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    rows: Vec<PointRow>,
    degree_text: String,
    fit: Option<Polynomial>,
    points: PointSet,
    last_error: Option<FitError>,
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationSession {
    /// A session with one empty row and the default degree.
    pub fn new() -> Self {
        Self::with_degree(DEFAULT_DEGREE)
    }

    pub fn with_degree(degree_text: impl Into<String>) -> Self {
        Self {
            rows: vec![PointRow::default()],
            degree_text: degree_text.into(),
            fit: None,
            points: PointSet::default(),
            last_error: None,
        }
    }

    pub fn rows(&self) -> &[PointRow] {
        &self.rows
    }

    pub fn degree_text(&self) -> &str {
        &self.degree_text
    }

    pub fn fit(&self) -> Option<&Polynomial> {
        self.fit.as_ref()
    }

    /// The samples used by the current fit attempt.
    pub fn points(&self) -> &PointSet {
        &self.points
    }

    /// Why the last refit produced no polynomial, if the fitter said so.
    pub fn last_error(&self) -> Option<&FitError> {
        self.last_error.as_ref()
    }

    /// Appends an empty row and returns its index.
    pub fn add_row(&mut self) -> usize {
        self.rows.push(PointRow::default());
        self.rows.len() - 1
    }

    /// Removes a row, keeping at least one row in the table.
    pub fn remove_row(&mut self, index: usize) {
        if index < self.rows.len() {
            self.rows.remove(index);
        }
        if self.rows.is_empty() {
            self.rows.push(PointRow::default());
        }
        self.refit();
    }

    /// Replaces one cell and refits. Out-of-range rows are ignored.
    pub fn set_cell(&mut self, row: usize, column: Column, text: impl Into<String>) {
        let Some(target) = self.rows.get_mut(row) else {
            warn!("[SESSION] Edit for missing row {row} ignored");
            return;
        };
        *target.cell_mut(column) = text.into();
        if column != Column::Comment {
            self.refit();
        }
    }

    pub fn set_degree_text(&mut self, text: impl Into<String>) {
        self.degree_text = text.into();
        self.refit();
    }

    /// Adds one row per line of a preset, energy filled and channel left blank.
    ///
    /// A single trailing empty row is reused so presets do not leave gaps.
    pub fn add_source(&mut self, name: &str, preset: &SourcePreset) {
        if self.rows.last().is_some_and(|row| *row == PointRow::default()) {
            self.rows.pop();
        }
        for line in &preset.energies {
            self.rows
                .push(PointRow::new("", line.value.to_string(), line.description.clone()));
        }
        if self.rows.is_empty() {
            self.rows.push(PointRow::default());
        }
        debug!(
            "[SESSION] Added source {} ({} lines)",
            name,
            preset.energies.len()
        );
        self.refit();
    }

    /// The degree as a non-negative integer, or `None` while the text is not one.
    pub fn degree(&self) -> Option<usize> {
        self.degree_text.trim().parse::<usize>().ok()
    }

    /// Recomputes the fit from the current rows and degree.
    ///
    /// No fit is produced while the degree is invalid or there are fewer than
    /// `degree + 1` usable points; fitter errors are kept in `last_error`.
    pub fn refit(&mut self) {
        self.points = collect_points(&self.rows);
        self.last_error = None;
        self.fit = None;

        let Some(degree) = self.degree() else {
            debug!("[SESSION] Degree '{}' is not usable", self.degree_text);
            return;
        };
        if self.points.len() < degree + 1 {
            return;
        }

        match Polynomial::from_fit(
            &self.points.xs(),
            &self.points.ys(),
            degree,
            CHANNEL_LABEL,
            ENERGY_LABEL,
        ) {
            Ok(fit) => {
                debug!("[SESSION] Refit: {fit}");
                self.fit = Some(fit);
            }
            Err(e) => {
                warn!("[SESSION] Fit failed: {e}");
                self.last_error = Some(e);
            }
        }
    }

    /// `Energy = ...` for the current fit, or the bare prefix without one.
    pub fn fit_text(&self) -> String {
        match &self.fit {
            Some(fit) => fit.to_string(),
            None => format!("{ENERGY_LABEL} = "),
        }
    }

    pub fn chi2(&self) -> Option<f64> {
        let fit = self.fit.as_ref()?;
        fit.chi2(&self.points.xs(), &self.points.ys()).ok()
    }

    pub fn chi2_text(&self) -> String {
        match self.chi2() {
            Some(chi2) => format!("Chi^2 = {chi2:.3}"),
            None => "Chi^2 = ".to_string(),
        }
    }

    /// Channel to energy. Empty while there is no fit or the input is not a number.
    pub fn convert_forward(&self, input: &str) -> String {
        match (&self.fit, parse_number(input)) {
            (Some(fit), Some(channel)) => format_value(fit.evaluate(channel)),
            _ => String::new(),
        }
    }

    /// Energy to channel: every real solution, comma separated.
    pub fn convert_reverse(&self, input: &str) -> String {
        let (Some(fit), Some(energy)) = (&self.fit, parse_number(input)) else {
            return String::new();
        };
        match fit.real_roots(energy) {
            Ok(roots) if roots.is_empty() => NO_REAL_ROOTS.to_string(),
            Ok(roots) => roots
                .iter()
                .map(|&root| format_value(root))
                .collect::<Vec<_>>()
                .join(", "),
            Err(e) => {
                warn!("[SESSION] Reverse conversion failed: {e}");
                String::new()
            }
        }
    }
}

/// Full precision with a decimal point kept on whole numbers (`10.0`, not `10`).
fn format_value(value: f64) -> String {
    format!("{value:?}")
}

fn parse_number(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

//! # Points Module
//!
//! Turns the free-text rows of the point table into validated samples.
//! Rows stay as text so a half-typed number never blocks editing; only
//! rows that parse cleanly reach the fitter.

use log::warn;

/// A validated `(x, y)` sample, typically `(channel, energy)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub x: f64,
    pub y: f64,
}

/// One row of the point table exactly as the user typed it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointRow {
    pub channel: String,
    pub energy: String,
    pub comment: String,
}

/// Why a row did not produce a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum RowIssue {
    /// Both numeric cells are empty. Not worth reporting.
    Blank,
    /// At least one numeric cell is filled but does not hold a finite number.
    Invalid { column: Column, text: String },
}

/// The editable columns of the point table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Channel,
    Energy,
    Comment,
}

impl Column {
    pub const ALL: [Column; 3] = [Column::Channel, Column::Energy, Column::Comment];

    pub fn title(self) -> &'static str {
        match self {
            Column::Channel => "Channel",
            Column::Energy => "Energy",
            Column::Comment => "Comment",
        }
    }
}

impl PointRow {
    pub fn new(
        channel: impl Into<String>,
        energy: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            energy: energy.into(),
            comment: comment.into(),
        }
    }

    pub fn cell(&self, column: Column) -> &str {
        match column {
            Column::Channel => &self.channel,
            Column::Energy => &self.energy,
            Column::Comment => &self.comment,
        }
    }

    pub fn cell_mut(&mut self, column: Column) -> &mut String {
        match column {
            Column::Channel => &mut self.channel,
            Column::Energy => &mut self.energy,
            Column::Comment => &mut self.comment,
        }
    }

    /// Parses the channel and energy cells. The comment is never looked at.
    pub fn parse(&self) -> Result<SamplePoint, RowIssue> {
        let channel = self.channel.trim();
        let energy = self.energy.trim();
        if channel.is_empty() && energy.is_empty() {
            return Err(RowIssue::Blank);
        }
        let x = parse_cell(Column::Channel, channel)?;
        let y = parse_cell(Column::Energy, energy)?;
        Ok(SamplePoint { x, y })
    }
}

fn parse_cell(column: Column, text: &str) -> Result<f64, RowIssue> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(RowIssue::Invalid {
            column,
            text: text.to_string(),
        }),
    }
}

/// The usable samples of a table plus the rows that had to be skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    pub points: Vec<SamplePoint>,
    /// Indices of non-blank rows that failed to parse.
    pub skipped: Vec<usize>,
}

impl PointSet {
    pub fn xs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Collects every parsable row, in table order.
///
/// Blank rows are ignored silently; malformed rows are skipped and their
/// indices recorded so the caller can tell the user.
pub fn collect_points(rows: &[PointRow]) -> PointSet {
    let mut set = PointSet::default();
    for (index, row) in rows.iter().enumerate() {
        match row.parse() {
            Ok(point) => set.points.push(point),
            Err(RowIssue::Blank) => {}
            Err(RowIssue::Invalid { column, text }) => {
                warn!(
                    "[POINTS] Skipping row {}: {} '{}' is not a number",
                    index + 1,
                    column.title(),
                    text
                );
                set.skipped.push(index);
            }
        }
    }
    set
}

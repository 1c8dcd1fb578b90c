//! # Energy Calibrator - Detector Calibration GUI
//!
//! This module contains the main GUI application for the energy calibrator.
//! The user types (channel, energy) pairs, picks a polynomial degree and
//! reads back the fit, its chi-squared and conversions in both directions.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Model**: `calib_core::CalibrationSession` holds every piece of state
//!   that is not a widget; the GUI only forwards edits and renders text
//! - **Keyboard**: Tab / Shift+Tab move between cells, Enter on the last
//!   row appends a new one

mod ui;
mod widgets;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use iced::keyboard::{self, key};
use iced::widget::{self, text_input};
use iced::{Element, Subscription, Task, Theme};
use log::{debug, info, warn};

use calib_core::{CalibrationSession, Column, SourceLibrary};
use ui::main_display::create_main_view;

/// Command line options.
#[derive(Parser, Debug)]
#[command(name = "calib-gui", version, about = "Polynomial channel-to-energy calibration")]
struct Args {
    /// JSON library of preset calibration sources (built-in library when omitted)
    #[arg(long, env = "CALIB_SOURCES")]
    sources: Option<PathBuf>,

    /// Initial polynomial degree
    #[arg(long, default_value_t = 1)]
    degree: usize,
}

/// Main entry point for the calibrator.
///
/// Parses the command line, sets up logging (`RUST_LOG` overrides the
/// default `info` level) and runs the Iced application.
pub fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    info!("[MAIN] Starting energy calibrator...");

    let sources = load_sources(args.sources.as_deref());
    let degree = args.degree;

    iced::application("Energy Calibrator", CalibratorApp::update, CalibratorApp::view)
        .subscription(CalibratorApp::subscription)
        .theme(CalibratorApp::theme)
        .run_with(move || (CalibratorApp::new(sources, degree), Task::none()))
        .context("calibrator window failed")?;

    info!("[MAIN] Application finished");
    Ok(())
}

/// Loads the preset library, falling back to the built-in one when the file is unusable.
fn load_sources(path: Option<&Path>) -> SourceLibrary {
    let Some(path) = path else {
        return SourceLibrary::builtin();
    };
    match SourceLibrary::load(path) {
        Ok(library) => library,
        Err(e) => {
            warn!(
                "[MAIN] Could not use {}: {}. Falling back to built-in sources.",
                path.display(),
                e
            );
            SourceLibrary::builtin()
        }
    }
}

/// Application message types for the Iced GUI framework.
#[derive(Debug, Clone)]
pub enum Message {
    // Point table
    CellEdited {
        row: usize,
        column: Column,
        text: String,
    },
    RowSubmitted(usize),   // Enter pressed inside a row
    AddRow,
    RemoveRow(usize),

    // Fit controls
    DegreeEdited(String),

    // Conversion boxes
    ForwardInput(String),  // Chan -> Energy
    ReverseInput(String),  // Energy -> Chan

    // Preset sources
    SourceSelected(String),

    // Keyboard navigation
    FocusNext,
    FocusPrevious,

    Exit,
}

/// Main application state.
///
/// Everything numeric lives in the session; the app only adds the text of
/// the two conversion boxes and the preset library.
#[derive(Debug)]
pub struct CalibratorApp {
    pub session: CalibrationSession,
    pub sources: SourceLibrary,
    pub forward_input: String,
    pub reverse_input: String,
}

/// Stable widget id of one table cell, used to move focus between rows.
pub fn cell_id(row: usize, column: Column) -> text_input::Id {
    text_input::Id::new(format!("cell-{row}-{column:?}"))
}

impl CalibratorApp {
    fn new(sources: SourceLibrary, degree: usize) -> Self {
        debug!(
            "[MAIN] {} preset sources available, starting at degree {}",
            sources.sources.len(),
            degree
        );
        let mut session = CalibrationSession::with_degree(degree.to_string());
        session.refit();
        Self {
            session,
            sources,
            forward_input: String::new(),
            reverse_input: String::new(),
        }
    }

    /// Handles application state updates based on incoming messages.
    ///
    /// Every edit goes through the session, which refits on its own; the
    /// conversion read-outs are derived from the session in `view`.
    fn update(&mut self, message: Message) -> Task<Message> {
        debug!("[UPDATE] Received message: {:?}", message);

        match message {
            Message::CellEdited { row, column, text } => {
                self.session.set_cell(row, column, text);
                Task::none()
            }
            Message::RowSubmitted(row) => {
                // Enter moves down a row, growing the table at the bottom.
                let next = row + 1;
                if next >= self.session.rows().len() {
                    self.session.add_row();
                }
                text_input::focus(cell_id(next, Column::Channel))
            }
            Message::AddRow => {
                let row = self.session.add_row();
                text_input::focus(cell_id(row, Column::Channel))
            }
            Message::RemoveRow(row) => {
                self.session.remove_row(row);
                Task::none()
            }
            Message::DegreeEdited(text) => {
                self.session.set_degree_text(text);
                Task::none()
            }
            Message::ForwardInput(text) => {
                self.forward_input = text;
                Task::none()
            }
            Message::ReverseInput(text) => {
                self.reverse_input = text;
                Task::none()
            }
            Message::SourceSelected(name) => {
                match self.sources.get(&name) {
                    Ok(preset) => {
                        info!("[MAIN] Adding source {}", name);
                        self.session.add_source(&name, preset);
                    }
                    Err(e) => warn!("[MAIN] {}", e),
                }
                Task::none()
            }
            Message::FocusNext => widget::focus_next(),
            Message::FocusPrevious => widget::focus_previous(),
            Message::Exit => {
                info!("[MAIN] Exit requested");
                iced::exit()
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(self)
    }

    /// Tab and Shift+Tab walk the focus through every input in order.
    fn subscription(&self) -> Subscription<Message> {
        keyboard::on_key_press(|pressed, modifiers| match pressed {
            keyboard::Key::Named(key::Named::Tab) if modifiers.shift() => {
                Some(Message::FocusPrevious)
            }
            keyboard::Key::Named(key::Named::Tab) => Some(Message::FocusNext),
            _ => None,
        })
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

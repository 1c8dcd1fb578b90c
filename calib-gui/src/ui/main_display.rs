//! # Main Display Module
//!
//! This module contains the layout of the calibrator window: the point
//! table on the left and the fit read-outs, conversions, plot and preset
//! sources on the right.

use iced::widget::{
    button, column, container, horizontal_space, row, scrollable, text, text_input, Space,
};
use iced::{Alignment, Element, Length};

use calib_core::Column;

use crate::widgets::curve_plot::CurvePlot;
use crate::{cell_id, CalibratorApp, Message};

/// Width of the point table panel.
const TABLE_WIDTH: f32 = 440.0;
/// Width of each conversion box.
const CONVERSION_WIDTH: f32 = 220.0;

/// Creates the complete main application view
pub fn create_main_view(app: &CalibratorApp) -> Element<'_, Message> {
    let table_panel = create_points_panel(app);

    let side = column![
        create_degree_row(app),
        Space::with_height(10),
        create_fit_panel(app),
        Space::with_height(10),
        create_conversion_row(app),
        Space::with_height(10),
        create_plot_panel(app),
        Space::with_height(10),
        create_sources_panel(app),
        Space::with_height(10),
        button(text("Exit").size(14)).padding([6, 14]).on_press(Message::Exit),
    ]
    .width(Length::Fill)
    .spacing(5);

    let main_content = row![table_panel, Space::with_width(10), side]
        .align_y(Alignment::Start)
        .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// Creates the point table: Channel / Energy / Comment columns of text inputs.
///
/// Enter in any cell moves to the next row (appending one at the bottom);
/// rows that hold something that is not a number are listed under the table.
fn create_points_panel(app: &CalibratorApp) -> Element<'_, Message> {
    let header = Column::ALL.iter().fold(row![].spacing(6), |header, column| {
        header.push(
            text(column.title())
                .size(14)
                .width(Length::FillPortion(1))
                .center(),
        )
    });
    let header = header.push(Space::with_width(28));

    let rows = app
        .session
        .rows()
        .iter()
        .enumerate()
        .fold(column![].spacing(4), |table, (index, point)| {
            let cells = Column::ALL.iter().fold(row![].spacing(6), |cells, &column| {
                cells.push(
                    text_input("", point.cell(column))
                        .id(cell_id(index, column))
                        .on_input(move |text| Message::CellEdited {
                            row: index,
                            column,
                            text,
                        })
                        .on_submit(Message::RowSubmitted(index))
                        .size(14)
                        .padding(4)
                        .width(Length::FillPortion(1)),
                )
            });
            table.push(
                cells
                    .push(
                        button(text("x").size(12))
                            .padding([2, 8])
                            .on_press(Message::RemoveRow(index)),
                    )
                    .align_y(Alignment::Center),
            )
        });

    let skipped = &app.session.points().skipped;
    let status = if skipped.is_empty() {
        text(format!("{} usable points", app.session.points().len())).size(12)
    } else {
        let listed: Vec<String> = skipped.iter().map(|i| (i + 1).to_string()).collect();
        text(format!(
            "{} usable points, skipped rows: {}",
            app.session.points().len(),
            listed.join(", ")
        ))
        .size(12)
    };

    container(
        column![
            text("Points").size(18),
            Space::with_height(10),
            header,
            scrollable(rows).height(Length::Fill),
            row![
                status,
                horizontal_space(),
                button(text("+ Row").size(14))
                    .padding([4, 10])
                    .on_press(Message::AddRow),
            ]
            .align_y(Alignment::Center),
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fixed(TABLE_WIDTH))
    .height(Length::Fill)
    .into()
}

/// Creates the `Degree = [ ]` entry.
fn create_degree_row(app: &CalibratorApp) -> Element<'_, Message> {
    row![
        text("Degree = ").size(16),
        text_input("", app.session.degree_text())
            .on_input(Message::DegreeEdited)
            .size(16)
            .padding(4)
            .width(Length::Fixed(60.0)),
    ]
    .align_y(Alignment::Center)
    .into()
}

/// Creates the fitted polynomial and chi-squared read-outs.
///
/// When the fitter rejected the data the reason is shown underneath, so an
/// empty fit line is never a mystery.
fn create_fit_panel(app: &CalibratorApp) -> Element<'_, Message> {
    let mut panel = column![
        text(app.session.fit_text()).size(16),
        text(app.session.chi2_text()).size(16),
    ]
    .spacing(5);

    if let Some(error) = app.session.last_error() {
        panel = panel.push(text(error.to_string()).size(12));
    }

    panel.into()
}

/// Creates the "Chan -> Energy" and "Energy -> Chan" boxes side by side.
fn create_conversion_row(app: &CalibratorApp) -> Element<'_, Message> {
    let forward = conversion_box(
        "Chan -> Energy",
        &app.forward_input,
        app.session.convert_forward(&app.forward_input),
        Message::ForwardInput,
    );
    let reverse = conversion_box(
        "Energy -> Chan",
        &app.reverse_input,
        app.session.convert_reverse(&app.reverse_input),
        Message::ReverseInput,
    );

    row![forward, Space::with_width(10), reverse].into()
}

/// A titled input with its converted result printed below.
fn conversion_box<'a>(
    title: &'static str,
    input: &'a str,
    output: String,
    on_input: fn(String) -> Message,
) -> Element<'a, Message> {
    container(
        column![
            text(title).size(14),
            text_input("", input).on_input(on_input).size(14).padding(4),
            text(output).size(14),
        ]
        .spacing(5)
        .padding(10),
    )
    .width(Length::Fixed(CONVERSION_WIDTH))
    .into()
}

/// Creates the calibration curve plot.
fn create_plot_panel(app: &CalibratorApp) -> Element<'_, Message> {
    let plot = CurvePlot::new(
        app.session.points().points.clone(),
        app.session.fit().cloned(),
    );

    container(plot.view())
        .width(Length::Fill)
        .height(Length::Fixed(220.0))
        .into()
}

/// Creates the "Add Source" list with one button per preset.
fn create_sources_panel(app: &CalibratorApp) -> Element<'_, Message> {
    let buttons = app.sources.names().fold(column![].spacing(6), |list, name| {
        list.push(
            button(text(name.to_string()).size(14).width(Length::Fill))
                .padding([4, 10])
                .width(Length::Fixed(160.0))
                .on_press(Message::SourceSelected(name.to_string())),
        )
    });

    let body: Element<'_, Message> = if app.sources.is_empty() {
        text("No preset sources").size(14).into()
    } else {
        scrollable(buttons).height(Length::Fixed(160.0)).into()
    };

    column![text("Add Source").size(18), Space::with_height(5), body]
        .spacing(5)
        .into()
}

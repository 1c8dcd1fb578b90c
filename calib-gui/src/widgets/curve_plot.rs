//! # Curve Plot Widget
//!
//! Draws the calibration points and the fitted polynomial on a canvas so a
//! bad point or an overfitted degree is visible at a glance.

use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Theme};

use calib_core::{Polynomial, SamplePoint};

/// Number of straight segments used to draw the fitted curve.
const CURVE_SEGMENTS: usize = 120;
/// Space kept free around the plot area for labels.
const MARGIN: f32 = 24.0;
const POINT_RADIUS: f32 = 3.5;

/// Scatter of the samples plus the current fit, if any.
pub struct CurvePlot {
    points: Vec<SamplePoint>,
    fit: Option<Polynomial>,
}

/// Data-space bounds of the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Extent {
    /// Covers every point and the curve between the outermost channels,
    /// padded by 5% so nothing sits on the border.
    fn covering(points: &[SamplePoint], fit: Option<&Polynomial>) -> Option<Self> {
        let first = points.first()?;
        let mut extent = Extent {
            x_min: first.x,
            x_max: first.x,
            y_min: first.y,
            y_max: first.y,
        };
        for p in points {
            extent.include(p.x, p.y);
        }
        if let Some(fit) = fit {
            let (x_min, x_max) = (extent.x_min, extent.x_max);
            for x in sample_channels(x_min, x_max) {
                extent.include(x, fit.evaluate(x));
            }
        }

        let pad_x = padding(extent.x_max - extent.x_min);
        let pad_y = padding(extent.y_max - extent.y_min);
        Some(Extent {
            x_min: extent.x_min - pad_x,
            x_max: extent.x_max + pad_x,
            y_min: extent.y_min - pad_y,
            y_max: extent.y_max + pad_y,
        })
    }

    fn include(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            return;
        }
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
    }

    /// Maps a data point into the drawable rectangle (y grows downwards on screen).
    fn project(&self, x: f64, y: f64, area: Rectangle) -> Point {
        let fx = ((x - self.x_min) / (self.x_max - self.x_min)) as f32;
        let fy = ((y - self.y_min) / (self.y_max - self.y_min)) as f32;
        Point::new(
            area.x + fx * area.width,
            area.y + area.height - fy * area.height,
        )
    }
}

/// 5% of the span, or a unit margin when all values coincide.
fn padding(span: f64) -> f64 {
    if span > 0.0 { span * 0.05 } else { 1.0 }
}

fn sample_channels(x_min: f64, x_max: f64) -> impl Iterator<Item = f64> {
    (0..=CURVE_SEGMENTS)
        .map(move |i| x_min + (x_max - x_min) * i as f64 / CURVE_SEGMENTS as f64)
}

impl CurvePlot {
    pub fn new(points: Vec<SamplePoint>, fit: Option<Polynomial>) -> Self {
        Self { points, fit }
    }

    pub fn view(self) -> Element<'static, super::super::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for CurvePlot {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        let text_color = theme.palette().text;

        if !bounds.width.is_finite() || !bounds.height.is_finite() {
            return vec![frame.into_geometry()];
        }

        let area = Rectangle {
            x: MARGIN,
            y: MARGIN / 2.0,
            width: (bounds.width - 1.5 * MARGIN).max(1.0),
            height: (bounds.height - 1.5 * MARGIN).max(1.0),
        };
        let border = Path::rectangle(area.position(), area.size());
        frame.stroke(
            &border,
            Stroke::default()
                .with_width(1.0)
                .with_color(Color::from_rgb8(0x60, 0x60, 0x60)),
        );

        let Some(extent) = Extent::covering(&self.points, self.fit.as_ref()) else {
            frame.fill_text(Text {
                content: "No points".to_string(),
                position: frame.center(),
                color: text_color,
                size: 14.0.into(),
                horizontal_alignment: iced::alignment::Horizontal::Center,
                vertical_alignment: iced::alignment::Vertical::Center,
                ..Text::default()
            });
            return vec![frame.into_geometry()];
        };

        if let Some(fit) = &self.fit {
            let curve = Path::new(|builder| {
                let mut started = false;
                for x in sample_channels(extent.x_min, extent.x_max) {
                    let y = fit.evaluate(x);
                    if !y.is_finite() {
                        continue;
                    }
                    let point = extent.project(x, y, area);
                    if started {
                        builder.line_to(point);
                    } else {
                        builder.move_to(point);
                        started = true;
                    }
                }
            });
            frame.stroke(
                &curve,
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb8(0x34, 0x98, 0xDB)),
            );
        }

        for p in &self.points {
            let dot = Path::circle(extent.project(p.x, p.y, area), POINT_RADIUS);
            frame.fill(&dot, Color::from_rgb8(0xFF, 0xC3, 0x00));
        }

        // Axis range labels
        let labels = [
            (
                format!("{:.1}", extent.x_min),
                Point::new(area.x, area.y + area.height + 4.0),
                iced::alignment::Horizontal::Left,
            ),
            (
                format!("{:.1}", extent.x_max),
                Point::new(area.x + area.width, area.y + area.height + 4.0),
                iced::alignment::Horizontal::Right,
            ),
            (
                format!("{:.1}", extent.y_max),
                Point::new(area.x + 4.0, area.y + 4.0),
                iced::alignment::Horizontal::Left,
            ),
        ];
        for (content, position, horizontal_alignment) in labels {
            frame.fill_text(Text {
                content,
                position,
                color: text_color,
                size: 11.0.into(),
                horizontal_alignment,
                vertical_alignment: iced::alignment::Vertical::Top,
                ..Text::default()
            });
        }

        vec![frame.into_geometry()]
    }
}

//! # Stick Gauge Widget
//!
//! Live position of one analog stick: the gate boundary, a center cross
//! and a handle at the current deflection, clamped to the gate shape.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Length, Point, Rectangle, Renderer, Theme};
use stickcal_core::StickSample;
use stickcal_core::session::StickCaliMode;

/// Edge length of the gauge in logical pixels.
const GAUGE_SIZE: f32 = 120.0;
const HANDLE_RADIUS: f32 = 6.0;
/// Corner radius of the square gate, relative to its half width.
const CORNER_RATIO: f32 = 0.2;

pub struct StickGauge {
    sample: StickSample,
    mode: StickCaliMode,
}

impl StickGauge {
    pub fn new(sample: StickSample, mode: StickCaliMode) -> Self {
        Self { sample, mode }
    }

    /// Deflection limited to the gate: the unit disc or the unit square.
    fn clamped(&self) -> (f32, f32) {
        let (x, y) = (self.sample.x, self.sample.y);
        match self.mode {
            StickCaliMode::Square => (x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0)),
            StickCaliMode::Circle => {
                let length = x.hypot(y);
                if length > 1.0 {
                    (x / length, y / length)
                } else {
                    (x, y)
                }
            }
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(Length::Fixed(GAUGE_SIZE))
                .height(Length::Fixed(GAUGE_SIZE)),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for StickGauge {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let center = frame.center();
        let radius = bounds.width.min(bounds.height) / 2.0 - HANDLE_RADIUS;
        if !radius.is_finite() || radius <= 0.0 {
            return vec![frame.into_geometry()];
        }

        let boundary = match self.mode {
            StickCaliMode::Circle => Path::circle(center, radius),
            StickCaliMode::Square => rounded_square(center, radius, radius * CORNER_RATIO),
        };
        frame.fill(&boundary, Color::from_rgb8(0x30, 0x30, 0x30));
        frame.stroke(
            &boundary,
            Stroke::default()
                .with_width(2.0)
                .with_color(Color::from_rgb8(0x80, 0x80, 0x80)),
        );

        // Center cross
        let guide = Stroke::default()
            .with_width(1.0)
            .with_color(Color::from_rgb8(0x50, 0x50, 0x50));
        frame.stroke(
            &Path::line(
                Point::new(center.x - radius, center.y),
                Point::new(center.x + radius, center.y),
            ),
            guide.clone(),
        );
        frame.stroke(
            &Path::line(
                Point::new(center.x, center.y - radius),
                Point::new(center.x, center.y + radius),
            ),
            guide,
        );

        // Handle; screen y grows downwards
        let (x, y) = self.clamped();
        if x.is_finite() && y.is_finite() {
            let handle = Point::new(center.x + x * radius, center.y - y * radius);
            frame.stroke(
                &Path::line(center, handle),
                Stroke::default()
                    .with_width(2.0)
                    .with_color(Color::from_rgb8(0x4C, 0x8B, 0xF5)),
            );
            frame.fill(
                &Path::circle(handle, HANDLE_RADIUS),
                Color::from_rgb8(0x4C, 0x8B, 0xF5),
            );
        }

        vec![frame.into_geometry()]
    }
}

fn rounded_square(center: Point, half: f32, corner: f32) -> Path {
    let (left, right) = (center.x - half, center.x + half);
    let (top, bottom) = (center.y - half, center.y + half);

    Path::new(|p| {
        p.move_to(Point::new(left + corner, top));
        p.line_to(Point::new(right - corner, top));
        p.arc_to(Point::new(right, top), Point::new(right, top + corner), corner);
        p.line_to(Point::new(right, bottom - corner));
        p.arc_to(Point::new(right, bottom), Point::new(right - corner, bottom), corner);
        p.line_to(Point::new(left + corner, bottom));
        p.arc_to(Point::new(left, bottom), Point::new(left, bottom - corner), corner);
        p.line_to(Point::new(left, top + corner));
        p.arc_to(Point::new(left, top), Point::new(left + corner, top), corner);
        p.close();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauge(x: f32, y: f32, mode: StickCaliMode) -> StickGauge {
        StickGauge::new(StickSample { x, y }, mode)
    }

    #[test]
    fn test_circle_gate_clamps_to_unit_disc() {
        let (x, y) = gauge(1.0, 1.0, StickCaliMode::Circle).clamped();
        assert!((x.hypot(y) - 1.0).abs() < 1e-6);
        assert!((x - y).abs() < 1e-6);

        assert_eq!(gauge(0.3, -0.4, StickCaliMode::Circle).clamped(), (0.3, -0.4));
    }

    #[test]
    fn test_square_gate_clamps_per_axis() {
        assert_eq!(gauge(1.0, 1.0, StickCaliMode::Square).clamped(), (1.0, 1.0));
        assert_eq!(gauge(1.5, -2.0, StickCaliMode::Square).clamped(), (1.0, -1.0));
    }
}

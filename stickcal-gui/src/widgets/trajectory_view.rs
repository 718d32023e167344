//! # Trajectory View Widget
//!
//! Shows the composited trajectory surface of one stick as an RGBA image,
//! with the unit circle and the detection radius drawn on top as guides.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::{container, image, stack, text};
use iced::{mouse, Color, Element, Length, Rectangle, Renderer, Theme};
use stickcal_core::trajectory::RenderState;

pub struct TrajectoryView<'a> {
    render: &'a RenderState,
    size: u32,
    detection_radius: f32,
}

impl<'a> TrajectoryView<'a> {
    pub fn new(render: &'a RenderState, size: u32, detection_radius: f32) -> Self {
        Self {
            render,
            size,
            detection_radius,
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        let size = Length::Fixed(self.size as f32);

        let surface: Element<'static, crate::Message> = match self.render.surface() {
            Some(surface) => image(image::Handle::from_rgba(
                surface.width(),
                surface.height(),
                surface.as_rgba().to_vec(),
            ))
            .width(size)
            .height(size)
            .into(),
            None => container(text("Circularity test off").size(14))
                .center_x(size)
                .center_y(size)
                .into(),
        };

        let guides = canvas::Canvas::new(RimGuide {
            detection_radius: self.detection_radius,
        })
        .width(size)
        .height(size);

        stack![surface, guides].into()
    }
}

/// Reference circles matching the surface mapping (unit circle = half size).
struct RimGuide {
    detection_radius: f32,
}

impl<Message> canvas::Program<Message> for RimGuide {
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
        let unit = bounds.width.min(bounds.height) / 2.0;

        if unit.is_finite() && unit > 0.0 {
            frame.stroke(
                &Path::circle(center, unit),
                Stroke::default()
                    .with_width(1.0)
                    .with_color(Color::from_rgba8(0xFF, 0xFF, 0xFF, 0.5)),
            );
            frame.stroke(
                &Path::circle(center, unit * self.detection_radius),
                Stroke::default()
                    .with_width(1.0)
                    .with_color(Color::from_rgba8(0xFF, 0xFF, 0xFF, 0.2)),
            );
        }

        vec![frame.into_geometry()]
    }
}

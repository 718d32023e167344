//! # Trajectory Module
//!
//! Real-time trajectory feedback for one stick, rendered in software into
//! RGBA buffers the GUI can blit as an image.
//!
//! ## Pipeline
//! - **Trail buffer**: every movement paints the triangle (origin, last
//!   point, current point); the union of those fans is the area swept
//! - **Overshoot buffer**: the same triangle, only while the stick is past
//!   the tolerance band, tinted from pale pink to solid red
//! - **Surface**: cleared and re-composited from both buffers each frame,
//!   so accumulated geometry never flickers and memory stays fixed

use crate::config::CircularityConfig;
use crate::StickSample;

/// Opacity used when compositing either buffer onto the surface.
pub const COMPOSITE_OPACITY: f32 = 0.3;

/// Excess radius at which the overshoot tint reaches solid red.
pub const OVERSHOOT_COLOR_SCALE: f32 = 0.4;

pub const TRAIL_COLOR: Rgb = Rgb::new(76, 139, 245);

/// Opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A point in pixel space (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

/// RGBA8 raster with straight alpha.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Creates a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Clears to transparent black.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Fills a triangle with an opaque color.
    ///
    /// A pixel is covered when its centre lies inside or on the triangle;
    /// winding does not matter and degenerate triangles paint nothing.
    pub fn fill_triangle(&mut self, vertices: [PixelPoint; 3], color: Rgb) {
        let [a, b, c] = vertices;
        let area = edge(a, b, c);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(self.width as i64 - 1);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(self.height as i64 - 1);
        if max_x < 0 || max_y < 0 {
            return;
        }

        for py in min_y..=max_y as u32 {
            for px in min_x..=max_x as u32 {
                let p = PixelPoint {
                    x: px as f32 + 0.5,
                    y: py as f32 + 0.5,
                };
                let w0 = edge(b, c, p);
                let w1 = edge(c, a, p);
                let w2 = edge(a, b, p);
                let inside = if area > 0.0 {
                    w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
                } else {
                    w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
                };
                if inside {
                    let i = (py as usize * self.width as usize + px as usize) * 4;
                    self.pixels[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, 255]);
                }
            }
        }
    }

    /// Source-over composites `src` onto `self` at the given opacity.
    /// Both buffers must share the same size; mismatched sources are skipped.
    pub fn composite(&mut self, src: &PixelBuffer, opacity: f32) {
        if src.width != self.width || src.height != self.height {
            log::warn!(
                "Skipping composite of {}x{} buffer onto {}x{} surface",
                src.width, src.height, self.width, self.height
            );
            return;
        }
        let opacity = opacity.clamp(0.0, 1.0);

        for (dst, src) in self
            .pixels
            .chunks_exact_mut(4)
            .zip(src.pixels.chunks_exact(4))
        {
            let sa = src[3] as f32 / 255.0 * opacity;
            if sa <= 0.0 {
                continue;
            }
            let da = dst[3] as f32 / 255.0;
            let out_a = sa + da * (1.0 - sa);
            for ch in 0..3 {
                let value = (src[ch] as f32 * sa + dst[ch] as f32 * da * (1.0 - sa)) / out_a;
                dst[ch] = value.round().clamp(0.0, 255.0) as u8;
            }
            dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Twice the signed area of (a, b, p).
fn edge(a: PixelPoint, b: PixelPoint, p: PixelPoint) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Maps a normalized stick position into a `width` x `height` surface.
pub fn to_pixel(sample: StickSample, width: u32, height: u32) -> PixelPoint {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    PixelPoint {
        x: center_x + sample.x * center_x,
        y: center_y - sample.y * center_y,
    }
}

/// Tint for an overshooting sample, `None` inside the tolerance band.
pub fn overshoot_color(radius: f32, overshoot_radius: f32) -> Option<Rgb> {
    let excess = radius - overshoot_radius;
    if !(excess > 0.0) {
        return None;
    }
    let ratio = (excess / OVERSHOOT_COLOR_SCALE).clamp(0.0, 1.0);
    let green_blue = (200.0 * (1.0 - ratio * ratio)).floor() as u8;
    Some(Rgb::new(255, green_blue, green_blue))
}

/// Off-screen accumulation buffers of one surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderBuffers {
    pub trail: PixelBuffer,
    pub overshoot: PixelBuffer,
}

/// Per-stick render state owned by the controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderState {
    surface: Option<PixelBuffer>,
    buffers: Option<RenderBuffers>,
    last_drawn: Option<StickSample>,
    pending_frame: Option<u64>,
    frame_counter: u64,
}

impl RenderState {
    /// The visible surface, if one was ever set up.
    pub fn surface(&self) -> Option<&PixelBuffer> {
        self.surface.as_ref()
    }

    pub fn buffers(&self) -> Option<&RenderBuffers> {
        self.buffers.as_ref()
    }

    pub fn last_drawn(&self) -> Option<StickSample> {
        self.last_drawn
    }

    /// Id of the frame waiting to be drawn.
    pub fn pending_frame(&self) -> Option<u64> {
        self.pending_frame
    }

    fn schedule_frame(&mut self) {
        self.frame_counter += 1;
        self.pending_frame = Some(self.frame_counter);
    }
}

/// Stateless trajectory logic over a [`RenderState`].
#[derive(Debug, Clone)]
pub struct TrajectoryRenderer {
    overshoot_radius: f32,
}

impl TrajectoryRenderer {
    pub fn new(config: &CircularityConfig) -> Self {
        Self {
            overshoot_radius: config.overshoot_radius(),
        }
    }

    /// Allocates the surface and both buffers and schedules the first frame.
    ///
    /// Only the first activation allocates; calling again while active is a
    /// no-op so accumulated geometry survives. Returns true if set up.
    pub fn setup(&self, state: &mut RenderState, width: u32, height: u32) -> bool {
        if state.buffers.is_some() {
            return false;
        }

        let reusable = state
            .surface
            .as_ref()
            .is_some_and(|s| s.width() == width && s.height() == height);
        if reusable {
            if let Some(surface) = state.surface.as_mut() {
                surface.clear();
            }
        } else {
            state.surface = Some(PixelBuffer::new(width, height));
        }
        state.buffers = Some(RenderBuffers {
            trail: PixelBuffer::new(width, height),
            overshoot: PixelBuffer::new(width, height),
        });
        state.last_drawn = None;
        if state.pending_frame.is_none() {
            state.schedule_frame();
        }
        log::info!("Trajectory buffers set up at {}x{}", width, height);
        true
    }

    /// Draws the pending frame for `sample`.
    ///
    /// Returns true when a next frame was scheduled. Without a pending frame
    /// or buffers (after teardown) nothing is drawn or scheduled.
    pub fn draw_frame(&self, state: &mut RenderState, sample: StickSample) -> bool {
        if state.pending_frame.take().is_none() {
            return false;
        }
        let (Some(surface), Some(buffers)) = (state.surface.as_mut(), state.buffers.as_mut()) else {
            return false;
        };

        if let Some(last) = state.last_drawn {
            if last != sample {
                let (width, height) = (surface.width(), surface.height());
                let triangle = [
                    to_pixel(StickSample::CENTER, width, height),
                    to_pixel(last, width, height),
                    to_pixel(sample, width, height),
                ];
                buffers.trail.fill_triangle(triangle, TRAIL_COLOR);

                if let Some(color) = overshoot_color(sample.radius(), self.overshoot_radius) {
                    buffers.overshoot.fill_triangle(triangle, color);
                }
            }
        }

        surface.clear();
        surface.composite(&buffers.trail, COMPOSITE_OPACITY);
        surface.composite(&buffers.overshoot, COMPOSITE_OPACITY);

        state.last_drawn = Some(sample);
        state.schedule_frame();
        true
    }

    /// Cancels the pending frame, clears the surface, releases the buffers.
    pub fn teardown(&self, state: &mut RenderState) {
        state.pending_frame = None;
        if let Some(surface) = state.surface.as_mut() {
            surface.clear();
        }
        if state.buffers.take().is_some() {
            log::info!("Trajectory buffers released");
        }
        state.last_drawn = None;
    }
}

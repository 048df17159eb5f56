//! Color resolution for the two pixel spaces.
//!
//! Stills are composited in straight-alpha RGBA overlay space. Video frames
//! are raw `bgr24` buffers, so frame colors carry blue first. The two types
//! are kept distinct so one cannot be passed where the other is expected.

use super::settings::ColorName;
use image::Rgba;

/// A color in video frame-buffer order (blue, green, red).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameColor {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl FrameColor {
    pub const fn new(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }

    /// Channel values in buffer order.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }
}

fn rgb(name: ColorName) -> (u8, u8, u8) {
    match name {
        ColorName::White => (255, 255, 255),
        ColorName::Black => (0, 0, 0),
        ColorName::Red => (255, 0, 0),
        ColorName::Green => (0, 255, 0),
        ColorName::Blue => (0, 0, 255),
        ColorName::Yellow => (255, 255, 0),
    }
}

/// Straight-alpha overlay color for still images.
pub fn to_overlay_color(name: ColorName, alpha: u8) -> Rgba<u8> {
    let (r, g, b) = rgb(name);
    Rgba([r, g, b, alpha])
}

/// Frame-buffer color for video frames.
pub fn to_frame_color(name: ColorName) -> FrameColor {
    let (r, g, b) = rgb(name);
    FrameColor::new(b, g, r)
}

/// Contrasting outline color: light colors get black, the rest get white.
pub fn outline_for(name: ColorName) -> ColorName {
    match name {
        ColorName::White | ColorName::Yellow => ColorName::Black,
        _ => ColorName::White,
    }
}

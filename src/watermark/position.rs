//! Position calculation for watermark placement.
//!
//! Returns the top-left anchor of the text box for one of the five named
//! placements, keeping a fixed margin from the canvas edges.
//!
//! # Example
//!
//! ```
//! use markbot::watermark::position::{place, ImageDimensions, TextDimensions, PlacementPosition};
//! use markbot::watermark::WatermarkPosition;
//!
//! let canvas = ImageDimensions { width: 800, height: 600 };
//! let text = TextDimensions { width: 100, height: 50 };
//!
//! let pos = place(&canvas, &text, WatermarkPosition::BottomRight);
//! assert_eq!(pos, PlacementPosition::new(670, 520)); // 800 - 100 - 30, 600 - 50 - 30
//! ```

use super::WatermarkPosition;
use crate::constants::EDGE_MARGIN;

/// Dimensions of the target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the rendered text box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner where the text box is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Anchor for `position` using the default edge margin.
pub fn place(
    canvas: &ImageDimensions,
    text: &TextDimensions,
    position: WatermarkPosition,
) -> PlacementPosition {
    calculate_position(position, canvas, text, EDGE_MARGIN)
}

/// Anchor for `position` with an explicit margin.
///
/// Coordinates are not clamped: they go negative when the text box is
/// larger than the canvas, and the text then renders partially off-canvas.
pub fn calculate_position(
    position: WatermarkPosition,
    canvas: &ImageDimensions,
    text: &TextDimensions,
    margin: i32,
) -> PlacementPosition {
    let img_w = canvas.width as i32;
    let img_h = canvas.height as i32;
    let txt_w = text.width as i32;
    let txt_h = text.height as i32;
    let m = margin;

    match position {
        WatermarkPosition::TopLeft => PlacementPosition::new(m, m),
        WatermarkPosition::TopRight => PlacementPosition::new(img_w - txt_w - m, m),
        WatermarkPosition::Center => PlacementPosition::new(
            (img_w - txt_w).div_euclid(2),
            (img_h - txt_h).div_euclid(2),
        ),
        WatermarkPosition::BottomLeft => PlacementPosition::new(m, img_h - txt_h - m),
        WatermarkPosition::BottomRight => {
            PlacementPosition::new(img_w - txt_w - m, img_h - txt_h - m)
        }
    }
}

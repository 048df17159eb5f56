//! Watermark composition engine.
//!
//! Renders a user's text watermark onto still images and onto every frame
//! of a video clip.
//!
//! # Components
//!
//! - **settings**: per-user style parameters (`WatermarkSettings`)
//! - **color**: symbolic color names to overlay (RGBA) and frame (BGR) colors
//! - **position**: anchor calculation for the five named placements
//! - **font** / **text_renderer**: font fallback chain and text rasterization
//! - **compositor**: still-image compositing (`PhotoCompositor`)
//! - **video**: frame-sequence compositing and re-encoding (`VideoCompositor`)

pub mod color;
pub mod compositor;
pub mod font;
pub mod position;
pub mod settings;
pub mod text_renderer;
pub mod video;

use crate::error::WatermarkError;

// Re-export main types for convenience
pub use color::{outline_for, to_frame_color, to_overlay_color, FrameColor};
pub use compositor::PhotoCompositor;
pub use font::{FontChain, GlyphFont};
pub use position::{place, ImageDimensions, PlacementPosition, TextDimensions};
pub use settings::{ColorName, WatermarkPosition, WatermarkSettings};
pub use video::{VideoCompositor, VideoInfo, VideoReport};

/// Renders settings onto an encoded still image.
pub trait PhotoRenderer: Send + Sync {
    /// Returns the watermarked image, encoded.
    fn render_photo(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError>;
}

/// Renders settings onto an encoded video clip.
///
/// Blocking and run-to-completion; callers run it off the event path.
pub trait VideoRenderer: Send + Sync {
    /// Returns the re-encoded clip.
    fn render_video(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError>;
}

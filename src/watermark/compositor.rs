//! Still-image watermark compositing.
//!
//! The text is stamped onto a transparent overlay the size of the source
//! canvas, then the overlay is merged onto the source with the "over"
//! operator. Outlines are produced by stamping the text in the outline color
//! at every offset within `outline_width` of the anchor before the
//! foreground stamp.
//!
//! # Example
//!
//! ```
//! use image::{DynamicImage, Rgb, RgbImage};
//! use markbot::watermark::compositor::PhotoCompositor;
//! use markbot::watermark::font::FontChain;
//! use markbot::watermark::WatermarkSettings;
//!
//! let compositor = PhotoCompositor::new(&FontChain::builtin_only(), 90);
//! let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 240, Rgb([20, 20, 20])));
//!
//! let output = compositor.render(&source, &WatermarkSettings::default());
//! assert_eq!(output.dimensions(), (320, 240));
//! ```

use super::color::{outline_for, to_overlay_color};
use super::font::{FontChain, GlyphFont};
use super::position::{place, ImageDimensions, PlacementPosition};
use super::text_renderer::{render_mask, TextMask};
use super::{PhotoRenderer, WatermarkSettings};
use crate::error::WatermarkError;
use image::{DynamicImage, ImageEncoder as _, Rgba, RgbImage, RgbaImage};
use std::io::Cursor;

/// Renders watermark settings onto still images.
#[derive(Debug, Clone)]
pub struct PhotoCompositor {
    font: GlyphFont,
    jpeg_quality: u8,
}

impl PhotoCompositor {
    /// Create a compositor, resolving its font once from `fonts`.
    pub fn new(fonts: &FontChain, jpeg_quality: u8) -> Self {
        Self {
            font: fonts.resolve(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    /// Render `settings` onto `image`, producing an opaque image of the same size.
    pub fn render(&self, image: &DynamicImage, settings: &WatermarkSettings) -> RgbImage {
        let mut base = image.to_rgba8();
        let canvas = ImageDimensions {
            width: base.width(),
            height: base.height(),
        };

        let mut overlay = RgbaImage::new(canvas.width, canvas.height);
        let mask = render_mask(&self.font, &settings.text, settings.font_size as f32);
        let anchor = place(&canvas, &mask.dimensions(), settings.position);

        if settings.outline {
            let outline_color = to_overlay_color(outline_for(settings.color), u8::MAX);
            let w = settings.outline_width as i32;
            for dx in -w..=w {
                for dy in -w..=w {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    stamp_text(&mut overlay, &mask, anchor.offset(dx, dy), outline_color);
                }
            }
        }

        stamp_text(
            &mut overlay,
            &mask,
            anchor,
            to_overlay_color(settings.color, settings.opacity),
        );

        composite_over(&mut base, &overlay);
        DynamicImage::ImageRgba8(base).to_rgb8()
    }

    /// Decode `data`, render `settings` onto it and encode the result as JPEG.
    pub fn render_bytes(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        let image =
            image::load_from_memory(data).map_err(|e| WatermarkError::Decode(e.to_string()))?;
        let rendered = self.render(&image, settings);
        encode_jpeg(&rendered, self.jpeg_quality)
    }
}

impl PhotoRenderer for PhotoCompositor {
    fn render_photo(
        &self,
        data: &[u8],
        settings: &WatermarkSettings,
    ) -> Result<Vec<u8>, WatermarkError> {
        self.render_bytes(data, settings)
    }
}

/// Encode an opaque image as JPEG.
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, WatermarkError> {
    let mut output = Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgb8,
        )
        .map_err(|e| WatermarkError::Encode(e.to_string()))?;
    Ok(output.into_inner())
}

/// Stamp a coverage mask onto `target` at `at` in `color`.
///
/// Each covered pixel moves toward `color` (all four channels) in
/// proportion to its coverage, so a fully covered pixel becomes exactly
/// `color`.
pub fn stamp_text(target: &mut RgbaImage, mask: &TextMask, at: PlacementPosition, color: Rgba<u8>) {
    let target_w = target.width() as i32;
    let target_h = target.height() as i32;

    let x_start = at.x.max(0);
    let y_start = at.y.max(0);
    let x_end = (at.x + mask.width() as i32).min(target_w);
    let y_end = (at.y + mask.height() as i32).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let coverage = mask.get(tx - at.x, ty - at.y);
            if coverage == 0 {
                continue;
            }
            let pixel = target.get_pixel_mut(tx as u32, ty as u32);
            for c in 0..4 {
                pixel[c] = lerp_u8(pixel[c], color[c], coverage);
            }
        }
    }
}

fn lerp_u8(from: u8, to: u8, t: u8) -> u8 {
    let t = u32::from(t);
    ((u32::from(from) * (255 - t) + u32::from(to) * t + 127) / 255) as u8
}

/// Merge `overlay` onto `base` with the "over" operator.
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    for (dst, src) in base.pixels_mut().zip(overlay.pixels()) {
        if src[3] == 0 {
            continue;
        }
        *dst = blend_pixels(*dst, *src);
    }
}

/// Porter-Duff "over": result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}

//! Text rasterization into coverage masks.
//!
//! Text is rendered once into an 8-bit coverage mask the size of its
//! measured box. Compositors then stamp the mask onto their own pixel
//! buffers in whatever color and at whatever offset they need.
//!
//! # Example
//!
//! ```
//! use markbot::watermark::font::FontChain;
//! use markbot::watermark::text_renderer::{measure_text, render_mask};
//!
//! let font = FontChain::builtin_only().resolve();
//! let mask = render_mask(&font, "Hello", 16.0);
//! assert_eq!(mask.dimensions(), measure_text(&font, "Hello", 16.0));
//! ```

use super::font::GlyphFont;
use super::position::TextDimensions;
use ab_glyph::{Font, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};

/// Padding added around outline-font text boxes.
const TEXT_PADDING: u32 = 2;

/// Side of a built-in bitmap glyph cell.
const BITMAP_CELL: u32 = 8;

/// 8-bit coverage mask of rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl TextMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> TextDimensions {
        TextDimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Coverage at `(x, y)`; zero outside the mask.
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    fn max_in(&mut self, x: i32, y: i32, coverage: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = self.data[idx].max(coverage);
    }

    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&c| c == 0)
    }

    /// Grow the mask by `radius` pixels on every side (square max filter).
    ///
    /// The result is `2 * radius` wider and taller; its origin sits at
    /// `(-radius, -radius)` relative to this mask.
    pub fn dilate(&self, radius: u32) -> TextMask {
        if radius == 0 {
            return self.clone();
        }

        let r = radius as i32;
        let out_w = self.width + 2 * radius;
        let out_h = self.height + 2 * radius;

        // Horizontal pass over the source rows
        let mut horizontal = TextMask::new(out_w, self.height);
        for y in 0..self.height as i32 {
            for x in 0..out_w as i32 {
                let src_x = x - r;
                let mut best = 0u8;
                for dx in -r..=r {
                    best = best.max(self.get(src_x + dx, y));
                }
                horizontal.data[y as usize * out_w as usize + x as usize] = best;
            }
        }

        // Vertical pass over the widened rows
        let mut out = TextMask::new(out_w, out_h);
        for y in 0..out_h as i32 {
            let src_y = y - r;
            for x in 0..out_w as i32 {
                let mut best = 0u8;
                for dy in -r..=r {
                    best = best.max(horizontal.get(x, src_y + dy));
                }
                out.data[y as usize * out_w as usize + x as usize] = best;
            }
        }

        out
    }
}

/// Calculate the dimensions of rendered text.
pub fn measure_text(font: &GlyphFont, text: &str, font_size: f32) -> TextDimensions {
    match font {
        GlyphFont::Outline(font) => {
            let scaled_font = font.as_scaled(PxScale::from(font_size));

            let mut width = 0.0f32;
            let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

            for c in text.chars() {
                let glyph_id = scaled_font.glyph_id(c);
                if let Some(prev) = prev_glyph {
                    width += scaled_font.kern(prev, glyph_id);
                }
                width += scaled_font.h_advance(glyph_id);
                prev_glyph = Some(glyph_id);
            }

            TextDimensions {
                width: width.ceil() as u32 + TEXT_PADDING,
                height: scaled_font.height().ceil() as u32 + TEXT_PADDING,
            }
        }
        GlyphFont::Builtin => {
            let scale = bitmap_scale(font_size);
            TextDimensions {
                width: (text.chars().count() as u32 * BITMAP_CELL * scale).max(1),
                height: BITMAP_CELL * scale,
            }
        }
    }
}

/// Rasterize `text` into a coverage mask of its measured size.
pub fn render_mask(font: &GlyphFont, text: &str, font_size: f32) -> TextMask {
    let dims = measure_text(font, text, font_size);
    let mut mask = TextMask::new(dims.width.max(1), dims.height.max(1));

    match font {
        GlyphFont::Outline(font) => {
            let scale = PxScale::from(font_size);
            let scaled_font = font.as_scaled(scale);
            let baseline_y = scaled_font.ascent();

            let mut cursor_x = 0.0f32;
            let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

            for c in text.chars() {
                let glyph_id = scaled_font.glyph_id(c);
                if let Some(prev) = prev_glyph {
                    cursor_x += scaled_font.kern(prev, glyph_id);
                }

                let glyph =
                    glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

                if let Some(outlined) = font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|px, py, coverage| {
                        let x = px as i32 + bounds.min.x as i32;
                        let y = py as i32 + bounds.min.y as i32;
                        let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                        mask.max_in(x, y, value);
                    });
                }

                cursor_x += scaled_font.h_advance(glyph_id);
                prev_glyph = Some(glyph_id);
            }
        }
        GlyphFont::Builtin => {
            let scale = bitmap_scale(font_size) as i32;
            let cell = BITMAP_CELL as i32 * scale;

            for (i, c) in text.chars().enumerate() {
                let rows = bitmap_glyph(c);
                let origin_x = i as i32 * cell;
                for (row, bits) in rows.iter().enumerate() {
                    for col in 0..BITMAP_CELL as i32 {
                        if (bits >> col) & 1 == 0 {
                            continue;
                        }
                        for sy in 0..scale {
                            for sx in 0..scale {
                                mask.max_in(
                                    origin_x + col * scale + sx,
                                    row as i32 * scale + sy,
                                    255,
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    mask
}

fn bitmap_scale(font_size: f32) -> u32 {
    ((font_size / BITMAP_CELL as f32).round() as u32).max(1)
}

fn bitmap_glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

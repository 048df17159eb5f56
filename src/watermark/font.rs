//! Font resolution with a fallback chain.
//!
//! Candidates are tried in order (bold faces first, then regular faces) and
//! the first file that parses as a TrueType/OpenType font wins. When every
//! candidate fails, the built-in 8x8 bitmap font is used, so resolution
//! never fails outward.

use ab_glyph::FontVec;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Well-known font locations, bold faces first.
const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A resolved font ready for measuring and rasterizing.
#[derive(Clone)]
pub enum GlyphFont {
    /// Scalable outline font loaded from disk.
    Outline(Arc<FontVec>),
    /// Built-in 8x8 bitmap font, scaled by whole pixels.
    Builtin,
}

impl std::fmt::Debug for GlyphFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outline(_) => f.write_str("GlyphFont::Outline"),
            Self::Builtin => f.write_str("GlyphFont::Builtin"),
        }
    }
}

impl GlyphFont {
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }
}

/// Ordered list of font files to try.
#[derive(Debug, Clone, Default)]
pub struct FontChain {
    candidates: Vec<PathBuf>,
}

impl FontChain {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Chain over the usual system font locations.
    pub fn system_default() -> Self {
        Self::new(DEFAULT_FONT_CANDIDATES.iter().map(PathBuf::from).collect())
    }

    /// Chain that always yields the built-in font.
    pub fn builtin_only() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Resolve the first usable font. Never fails.
    pub fn resolve(&self) -> GlyphFont {
        for path in &self.candidates {
            match load_font_file(path) {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), "Loaded watermark font");
                    return GlyphFont::Outline(Arc::new(font));
                }
                Err(reason) => {
                    tracing::debug!(path = %path.display(), reason = %reason, "Font candidate unavailable");
                }
            }
        }

        if !self.candidates.is_empty() {
            tracing::warn!(
                candidates = self.candidates.len(),
                "No font candidate could be loaded, using built-in bitmap font"
            );
        }
        GlyphFont::Builtin
    }
}

fn load_font_file(path: &Path) -> Result<FontVec, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;
    FontVec::try_from_vec(data).map_err(|e| e.to_string())
}

//! Per-user watermark style settings.
//!
//! Every field always holds a valid value: the setters validate against the
//! enumerated presets and leave the settings untouched on rejection.

use crate::constants::{
    DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_OUTLINE_WIDTH, DEFAULT_TEXT, FONT_SIZE_PRESETS,
    MAX_OUTLINE_WIDTH, MAX_TEXT_CHARS, OPACITY_STEPS_PERCENT,
};
use crate::error::WatermarkError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Watermark placement on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    Center,
    BottomLeft,
    #[default]
    BottomRight,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 5] = [
        Self::TopLeft,
        Self::TopRight,
        Self::Center,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    /// Strict parse of a position name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "top_left" => Some(Self::TopLeft),
            "top_right" => Some(Self::TopRight),
            "center" => Some(Self::Center),
            "bottom_left" => Some(Self::BottomLeft),
            "bottom_right" => Some(Self::BottomRight),
            _ => None,
        }
    }

    /// Lenient lookup: unknown names resolve to bottom-right.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top_left",
            Self::TopRight => "top_right",
            Self::Center => "center",
            Self::BottomLeft => "bottom_left",
            Self::BottomRight => "bottom_right",
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Symbolic text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorName {
    #[default]
    White,
    Black,
    Red,
    Green,
    Blue,
    Yellow,
}

impl ColorName {
    pub const ALL: [ColorName; 6] = [
        Self::White,
        Self::Black,
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
    ];

    /// Strict parse of a color name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "white" => Some(Self::White),
            "black" => Some(Self::Black),
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "yellow" => Some(Self::Yellow),
            _ => None,
        }
    }

    /// Lenient lookup: unknown names resolve to white.
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style parameters consumed by both compositors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Watermark text, 1..=50 characters
    pub text: String,
    /// Font size in pixels, one of the presets
    pub font_size: u32,
    /// Alpha byte applied to the foreground text
    pub opacity: u8,
    pub position: WatermarkPosition,
    pub color: ColorName,
    /// Draw a contrasting stroke around the text
    pub outline: bool,
    /// Stroke radius in pixels
    pub outline_width: u32,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            opacity: DEFAULT_OPACITY,
            position: WatermarkPosition::default(),
            color: ColorName::default(),
            outline: true,
            outline_width: DEFAULT_OUTLINE_WIDTH,
        }
    }
}

/// Check that `text` is an acceptable watermark text.
pub fn validate_text(text: &str) -> Result<(), WatermarkError> {
    let len = text.chars().count();
    if len == 0 {
        return Err(WatermarkError::Validation(
            "Text cannot be empty. Please send a shorter text.".to_string(),
        ));
    }
    if len > MAX_TEXT_CHARS {
        return Err(WatermarkError::Validation(format!(
            "Text is too long ({len} characters). Maximum is {MAX_TEXT_CHARS} characters."
        )));
    }
    Ok(())
}

/// Convert a UI percentage to the stored alpha byte.
pub fn percent_to_alpha(percent: u8) -> u8 {
    ((u32::from(percent.min(100)) * 255 + 50) / 100) as u8
}

impl WatermarkSettings {
    pub fn set_text(&mut self, text: &str) -> Result<(), WatermarkError> {
        validate_text(text)?;
        self.text = text.to_string();
        Ok(())
    }

    pub fn set_font_size(&mut self, font_size: u32) -> Result<(), WatermarkError> {
        if !FONT_SIZE_PRESETS.contains(&font_size) {
            return Err(WatermarkError::Validation(format!(
                "Font size must be one of {FONT_SIZE_PRESETS:?}, got {font_size}"
            )));
        }
        self.font_size = font_size;
        Ok(())
    }

    /// Set opacity from one of the UI percentage steps.
    pub fn set_opacity_percent(&mut self, percent: u8) -> Result<(), WatermarkError> {
        if !OPACITY_STEPS_PERCENT.contains(&percent) {
            return Err(WatermarkError::Validation(format!(
                "Opacity must be one of {OPACITY_STEPS_PERCENT:?} percent, got {percent}"
            )));
        }
        self.opacity = percent_to_alpha(percent);
        Ok(())
    }

    pub fn set_outline_width(&mut self, width: u32) -> Result<(), WatermarkError> {
        if width == 0 || width > MAX_OUTLINE_WIDTH {
            return Err(WatermarkError::Validation(format!(
                "Outline width must be between 1 and {MAX_OUTLINE_WIDTH}, got {width}"
            )));
        }
        self.outline_width = width;
        Ok(())
    }

    pub fn toggle_outline(&mut self) {
        self.outline = !self.outline;
    }

    /// Opacity as a rounded percentage for display.
    pub fn opacity_percent(&self) -> u8 {
        ((u32::from(self.opacity) * 100 + 127) / 255) as u8
    }

    /// Foreground alpha as a fraction in `0.0..=1.0`.
    pub fn alpha(&self) -> f32 {
        f32::from(self.opacity) / 255.0
    }

    /// Human-readable summary for chat replies.
    pub fn summary(&self) -> String {
        let outline = if self.outline {
            format!("on ({} px)", self.outline_width)
        } else {
            "off".to_string()
        };
        format!(
            "Current settings:\n\
             Text: {}\n\
             Font size: {}\n\
             Opacity: {}%\n\
             Position: {}\n\
             Color: {}\n\
             Outline: {}",
            self.text,
            self.font_size,
            self.opacity_percent(),
            self.position,
            self.color,
            outline
        )
    }
}

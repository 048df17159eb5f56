// Menu action tokens

use crate::watermark::{ColorName, WatermarkPosition};
use std::str::FromStr;

/// A parsed menu button press.
///
/// Tokens are either bare (`confirm`) or `field:value` (`size:64`).
/// Parsing is syntactic: numeric values are range-checked when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Confirm,
    Cancel,
    ChangeText,
    Size(u32),
    OpacityPercent(u8),
    Position(WatermarkPosition),
    Color(ColorName),
    ToggleOutline,
    OutlineWidth(u32),
    Reset,
    ShowSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for MenuAction {
    type Err = UnknownAction;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownAction(token.to_string());

        let action = match token.split_once(':') {
            None => match token {
                "confirm" => Self::Confirm,
                "cancel" => Self::Cancel,
                "change_text" => Self::ChangeText,
                "reset" => Self::Reset,
                "show_settings" => Self::ShowSettings,
                _ => return Err(unknown()),
            },
            Some(("size", value)) => Self::Size(value.parse().map_err(|_| unknown())?),
            Some(("opacity", value)) => {
                Self::OpacityPercent(value.parse().map_err(|_| unknown())?)
            }
            Some(("position", value)) => {
                Self::Position(WatermarkPosition::parse(value).ok_or_else(unknown)?)
            }
            Some(("color", value)) => Self::Color(ColorName::parse(value).ok_or_else(unknown)?),
            Some(("outline", "toggle")) => Self::ToggleOutline,
            Some(("outline_width", value)) => {
                Self::OutlineWidth(value.parse().map_err(|_| unknown())?)
            }
            Some(_) => return Err(unknown()),
        };

        Ok(action)
    }
}

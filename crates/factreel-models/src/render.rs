//! Frame rendering vocabulary: canvas constants, colors, font roles and text blocks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output canvas width (portrait 9:16).
pub const CANVAS_WIDTH: u32 = 1080;
/// Output canvas height (portrait 9:16).
pub const CANVAS_HEIGHT: u32 = 1920;
/// Output frame rate.
pub const FPS: u32 = 30;

/// Horizontal margin of divider rules.
pub const MARGIN_X: u32 = 80;
/// Initial vertical cursor (about 10% of the canvas height).
pub const LAYOUT_TOP: u32 = 200;
/// Hashtag line offset from the bottom edge. Not cursor driven.
pub const HASHTAG_BOTTOM_OFFSET: u32 = 150;
/// Alpha of the black overlay composited over photo backgrounds.
pub const OVERLAY_ALPHA: u8 = 160;

pub const BACKGROUND_COLOR: Rgb = Rgb::new(15, 15, 30);
pub const ACCENT_COLOR: Rgb = Rgb::new(255, 200, 0);
pub const PRIMARY_TEXT_COLOR: Rgb = Rgb::new(255, 255, 255);
pub const SECONDARY_TEXT_COLOR: Rgb = Rgb::new(200, 200, 220);
pub const DIVIDER_COLOR: Rgb = Rgb::new(80, 80, 120);
pub const HASHTAG_COLOR: Rgb = Rgb::new(150, 150, 200);

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// `#rrggbb` notation, as used in SVG paint attributes.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    pub fn to_array(&self) -> [u8; 3] {
        [self.0, self.1, self.2]
    }
}

/// Typographic role of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FontRole {
    Title,
    Body,
    Small,
}

impl FontRole {
    /// Font size in pixels.
    pub fn size_px(&self) -> f32 {
        match self {
            FontRole::Title => 72.0,
            FontRole::Body => 48.0,
            FontRole::Small => 38.0,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontRole::Title)
    }
}

/// A block of text derived from one content record field.
///
/// Stateless and recreated for every render. `max_line_width_chars` is a
/// character budget chosen empirically per font size, not a pixel width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextBlock {
    pub content: String,
    pub font_role: FontRole,
    pub max_line_width_chars: usize,
    pub color: Rgb,
    pub line_height_px: u32,
}

impl TextBlock {
    /// Title: uppercased, accent color, largest font, about 20 chars per line.
    pub fn title(text: &str) -> Self {
        Self {
            content: text.to_uppercase(),
            font_role: FontRole::Title,
            max_line_width_chars: 20,
            color: ACCENT_COLOR,
            line_height_px: 90,
        }
    }

    /// Lead sentence in the secondary color.
    pub fn lead(text: &str) -> Self {
        Self {
            content: text.to_string(),
            font_role: FontRole::Body,
            max_line_width_chars: 32,
            color: SECONDARY_TEXT_COLOR,
            line_height_px: 60,
        }
    }

    /// Main body text.
    pub fn body(text: &str) -> Self {
        Self {
            content: text.to_string(),
            font_role: FontRole::Body,
            max_line_width_chars: 30,
            color: PRIMARY_TEXT_COLOR,
            line_height_px: 65,
        }
    }

    /// Hashtag line. The budget is the string length, so it never wraps.
    pub fn hashtags(text: &str) -> Self {
        Self {
            content: text.to_string(),
            font_role: FontRole::Small,
            max_line_width_chars: text.chars().count().max(1),
            color: HASHTAG_COLOR,
            line_height_px: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color() {
        assert_eq!(ACCENT_COLOR.to_hex(), "#ffc800");
        assert_eq!(BACKGROUND_COLOR.to_hex(), "#0f0f1e");
    }

    #[test]
    fn test_title_block_is_uppercased() {
        let block = TextBlock::title("Le miel ne périme jamais");
        assert_eq!(block.content, "LE MIEL NE PÉRIME JAMAIS");
        assert_eq!(block.font_role, FontRole::Title);
        assert!(block.font_role.is_bold());
    }

    #[test]
    fn test_hashtag_budget_matches_length() {
        let block = TextBlock::hashtags("#fait #insolite");
        assert_eq!(block.max_line_width_chars, 15);
        assert_eq!(TextBlock::hashtags("").max_line_width_chars, 1);
    }
}

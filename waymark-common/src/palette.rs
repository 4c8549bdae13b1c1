//! Brand colors used by the marker renderer and the route overlay

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An opaque sRGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `#rrggbb` and the short `#rgb` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Config(format!("invalid color '{s}', expected #rrggbb"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Color::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Named colors of the app's map styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub start: Color,
    pub end: Color,
    pub pen: Color,
    pub route_path: Color,
    pub neutral: Color,
    pub cluster_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: Color::rgb(0x69, 0xe3, 0xc4),
            secondary: Color::rgb(0x1f, 0x3a, 0x4d),
            start: Color::rgb(0x22, 0xc5, 0x5e),
            end: Color::rgb(0xef, 0x44, 0x44),
            pen: Color::rgb(0xff, 0x8c, 0x00),
            route_path: Color::rgb(0x00, 0xa8, 0xe8),
            neutral: Color::rgb(0xff, 0xff, 0xff),
            cluster_text: Color::rgb(0x0b, 0x1b, 0x26),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let color: Color = "#FF8C00".parse().unwrap();
        assert_eq!(color, Color::rgb(255, 140, 0));
        assert_eq!(color.to_string(), "#ff8c00");

        let short: Color = "#0f0".parse().unwrap();
        assert_eq!(short, Color::rgb(0, 255, 0));
    }

    #[test]
    fn test_rejects_malformed_colors() {
        assert!("ff8c00".parse::<Color>().is_err());
        assert!("#ff8c0".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("#ÿÿÿ".parse::<Color>().is_err());
    }

    #[test]
    fn test_serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::rgb(1, 2, 3));
    }
}

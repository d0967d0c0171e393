//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::piece::PieceColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// UI colours around the board. Piece colours come from the game palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Playfield and empty-cell background.
    pub bg: Color,
    /// Board border and panel frames.
    pub div_line: Color,
    /// Text (score, level, lines).
    pub main_fg: Color,
    /// Titles and the header bar.
    pub title: Color,
    /// Outline of the drop hint.
    pub hint_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::brutalist()
    }
}

impl Theme {
    /// Black board, white frames: the high-contrast default.
    pub const fn brutalist() -> Self {
        Self {
            bg: Color::Rgb(0x00, 0x00, 0x00),
            div_line: Color::Rgb(0xFF, 0xFF, 0xFF),
            main_fg: Color::Rgb(0xFF, 0xFF, 0xFF),
            title: Color::Rgb(0xFF, 0x00, 0x00),
            hint_fg: Color::Rgb(0xFF, 0xFF, 0xFF),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// No path means the default theme; unknown or malformed keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        Ok(Self::from_map(&map))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let base = Self::brutalist();
        Self {
            bg: get("main_bg").unwrap_or(base.bg),
            div_line: get("div_line").unwrap_or(base.div_line),
            main_fg: get("main_fg").unwrap_or(base.main_fg),
            title: get("title").unwrap_or(base.title),
            hint_fg: get("hint_fg").unwrap_or(base.hint_fg),
        }
    }

    /// Terminal colour for a piece/cell colour.
    #[inline]
    pub fn piece_color(&self, color: PieceColor) -> Color {
        let (r, g, b) = color.rgb();
        Color::Rgb(r, g, b)
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'').trim();
            if !value.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    match digits.len() {
        6 if digits.is_ascii() => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 if digits.is_ascii() => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(ThemeError::InvalidHex(s.to_string())),
    }
}

//! Hex color parsing.

use image::Rgb;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("color value must not be empty")]
    Empty,
    #[error("cannot parse color value: {0}")]
    Invalid(String),
}

/// Parse `#rgb`, `#rrggbb` (leading `#` optional) into an RGB pixel.
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, ColorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::Invalid(value.to_string()));
    }

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(ColorError::Invalid(value.to_string())),
    };

    let channel = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| ColorError::Invalid(value.to_string()))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

//! Size normalization and borders.
//!
//! Styling runs right after decode and always yields an RGB8 image:
//!
//! 1. **Canvas**: if the source is smaller than `min_size` or off-ratio, it is
//!    fitted onto the smallest canvas with the exact target ratio
//!    ([`compute_target_size`]). `contain` pads with the background color,
//!    `cover` fills and center-crops.
//! 2. **Solid border**: `border_thickness` pixels of `border_color` on every
//!    edge. Needs both keys; the canvas grows by twice the thickness per axis.
//! 3. **Border overlay**: an image stretched to the final canvas and
//!    alpha-composited on top. A border that fails to decode is logged and
//!    ignored.

use super::calculations::{
    calculate_contain_dimensions, center_offset, compute_target_size, needs_resize,
};
use crate::colors::{self, ColorError};
use crate::config::{FitMode, StylingConfig};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("aspect ratio must be positive, got {0}:{1}")]
    InvalidAspectRatio(u32, u32),
    #[error("minimum size must be positive, got {0}x{1}")]
    InvalidMinSize(u32, u32),
    #[error("image has no pixels")]
    EmptyImage,
    #[error(transparent)]
    Color(#[from] ColorError),
}

/// Apply canvas normalization, border and border overlay.
///
/// The input is never modified; a compliant image comes back as a copy.
pub fn apply_styling(
    image: &DynamicImage,
    config: &StylingConfig,
) -> Result<DynamicImage, StyleError> {
    let (ratio_w, ratio_h) = config.aspect_ratio;
    if ratio_w == 0 || ratio_h == 0 {
        return Err(StyleError::InvalidAspectRatio(ratio_w, ratio_h));
    }
    let (min_w, min_h) = config.min_size;
    if min_w == 0 || min_h == 0 {
        return Err(StyleError::InvalidMinSize(min_w, min_h));
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(StyleError::EmptyImage);
    }

    let source = image.to_rgb8();
    let size = source.dimensions();
    let mut styled = if needs_resize(size, config.aspect_ratio, config.min_size) {
        let target = compute_target_size(config.aspect_ratio, config.min_size);
        match config.mode {
            FitMode::Contain => {
                let background = colors::parse_hex_color(&config.background_color)?;
                contain(&source, target, background)
            }
            FitMode::Cover => DynamicImage::ImageRgb8(source)
                .resize_to_fill(target.0, target.1, FilterType::Lanczos3)
                .into_rgb8(),
        }
    } else {
        source
    };

    if config.border_thickness > 0 {
        if let Some(color) = &config.border_color {
            let color = colors::parse_hex_color(color)?;
            styled = expand(&styled, config.border_thickness, color);
        }
    }

    if let Some(border_path) = &config.border_image {
        styled = overlay_border(styled, border_path);
    }

    Ok(DynamicImage::ImageRgb8(styled))
}

/// Fit `source` inside `target`, centered on a solid background.
fn contain(source: &RgbImage, target: (u32, u32), background: Rgb<u8>) -> RgbImage {
    let (fit_w, fit_h) = calculate_contain_dimensions(source.dimensions(), target);
    let resized = imageops::resize(source, fit_w, fit_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(target.0, target.1, background);
    let (x, y) = center_offset(target, (fit_w, fit_h));
    imageops::replace(&mut canvas, &resized, x as i64, y as i64);
    canvas
}

/// Surround `image` with a solid frame of `thickness` pixels.
fn expand(image: &RgbImage, thickness: u32, color: Rgb<u8>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(
        image.width() + 2 * thickness,
        image.height() + 2 * thickness,
        color,
    );
    imageops::replace(&mut canvas, image, thickness as i64, thickness as i64);
    canvas
}

fn overlay_border(styled: RgbImage, border_path: &Path) -> RgbImage {
    let border = match image::open(border_path) {
        Ok(border) => border.into_rgba8(),
        Err(e) => {
            warn!(path = %border_path.display(), error = %e, "Skipping unreadable border image");
            return styled;
        }
    };

    let (width, height) = styled.dimensions();
    let border = imageops::resize(&border, width, height, FilterType::Lanczos3);
    let mut base = DynamicImage::ImageRgb8(styled).into_rgba8();
    imageops::overlay(&mut base, &border, 0, 0);
    DynamicImage::ImageRgba8(base).into_rgb8()
}

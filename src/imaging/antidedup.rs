//! Stochastic perturbations that make near-identical outputs fingerprint
//! differently.
//!
//! Every random decision comes from the caller's generator, so one seed
//! always yields the same pixels. Stages run in a fixed order and each one
//! that fires appends a tag to the returned list:
//!
//! | Stage | Runs when | Tag |
//! |---|---|---|
//! | Mirror | mode ≠ none, `allow_mirror`, 10% draw | `mirror` |
//! | Color jitter | light/medium/heavy, strength > 0 | `color_jitter(brightness=…, contrast=…, saturation=…)` |
//! | Noise | light/medium/heavy, strength > 0 | `noise(strength=…)` |
//! | Rotation | medium/heavy, \|angle\| ≥ 0.001° | `rotate(angle=…)` |
//! | Texture | `texture.enabled`, any mode | `texture(opacity=…)` |
//! | Watermarks | heavy | `watermark(count=…)` |
//!
//! Noise is generated from a second generator seeded by one draw of the
//! first, so the bulk per-pixel stream never shifts the scalar draws that
//! follow it.

use super::calculations::{
    calculate_contain_dimensions, center_offset, rotated_bounds, scale_dimensions,
};
use super::glyphs;
use crate::config::{
    AntiDedupConfig, AntiDedupMode, TextureConfig, WatermarkConfig, normalized,
};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::warn;

/// Probability of a horizontal flip when mirroring is allowed.
pub const MIRROR_PROBABILITY: f64 = 0.1;
/// Angles below this (degrees) are treated as no rotation.
const MIN_ROTATION: f64 = 0.001;
/// Text used when the configured watermark text is empty.
pub const DEFAULT_WATERMARK_TEXT: &str = "digital-dust";
/// Watermark glyph dot size before per-placement scaling.
const WATERMARK_DOT: u32 = 2;

#[derive(Error, Debug)]
pub enum AntiDedupError {
    #[error("{name} must have finite bounds, got ({lo}, {hi})")]
    InvalidRange { name: &'static str, lo: f64, hi: f64 },
    #[error("{name} must be a finite number, got {value}")]
    InvalidStrength { name: &'static str, value: f64 },
}

/// Apply the configured perturbations to `image`.
///
/// Returns the new image and the ordered tags of every stage that fired.
/// With mode `none` and texture disabled the output equals the input and
/// the tag list is empty.
pub fn apply_antidedup<R: Rng>(
    image: &DynamicImage,
    config: &AntiDedupConfig,
    rng: &mut R,
) -> Result<(DynamicImage, Vec<String>), AntiDedupError> {
    let mut operations = Vec::new();
    let mut working = image.to_rgb8();
    let mode = config.mode;

    if mode != AntiDedupMode::None {
        if config.allow_mirror && rng.gen_bool(MIRROR_PROBABILITY) {
            imageops::flip_horizontal_in_place(&mut working);
            operations.push("mirror".to_string());
        }

        if mode.jitters() {
            let jitter =
                checked_strength("anti_dedup.color_jitter_strength", config.color_jitter_strength)?;
            let noise = checked_strength("anti_dedup.noise_strength", config.noise_strength)?;
            color_jitter(&mut working, jitter, rng, &mut operations);
            add_noise(&mut working, noise, rng, &mut operations);
        }

        if mode.rotates() {
            let range = checked_range("anti_dedup.rotation_range", config.rotation_range)?;
            working = rotate_and_crop(working, range, config.crop_margin, rng, &mut operations);
        }
    }

    if config.texture.enabled {
        working = apply_texture(working, &config.texture, &mut operations);
    }

    if mode.watermarks() {
        working = apply_watermarks(working, &config.watermark, rng, &mut operations)?;
    }

    Ok((DynamicImage::ImageRgb8(working), operations))
}

fn checked_range(name: &'static str, range: (f64, f64)) -> Result<(f64, f64), AntiDedupError> {
    let (lo, hi) = normalized(range);
    if !lo.is_finite() || !hi.is_finite() {
        return Err(AntiDedupError::InvalidRange { name, lo, hi });
    }
    Ok((lo, hi))
}

fn checked_strength(name: &'static str, value: f64) -> Result<f64, AntiDedupError> {
    if !value.is_finite() {
        return Err(AntiDedupError::InvalidStrength { name, value });
    }
    Ok(value)
}

fn uniform<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    rng.gen_range(lo..=hi)
}

// ============================================================================
// Color jitter
// ============================================================================

fn luma(pixel: &Rgb<u8>) -> f32 {
    let [r, g, b] = pixel.0;
    (r as f32 * 299.0 + g as f32 * 587.0 + b as f32 * 114.0) / 1000.0
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Brightness, contrast and saturation, each scaled by `1 + U[-s, s]`.
fn color_jitter<R: Rng>(
    image: &mut RgbImage,
    strength: f64,
    rng: &mut R,
    operations: &mut Vec<String>,
) {
    if strength <= 0.0 {
        return;
    }

    let brightness = 1.0 + rng.gen_range(-strength..=strength);
    for pixel in image.pixels_mut() {
        pixel.apply(|c| clamp_channel(c as f32 * brightness as f32));
    }

    let contrast = 1.0 + rng.gen_range(-strength..=strength);
    let pixel_count = (image.width() as f64 * image.height() as f64).max(1.0);
    let total: f64 = image.pixels().map(|p| luma(p) as f64).sum();
    let mean = (total / pixel_count).round() as f32;
    for pixel in image.pixels_mut() {
        pixel.apply(|c| clamp_channel(mean + (c as f32 - mean) * contrast as f32));
    }

    let saturation = 1.0 + rng.gen_range(-strength..=strength);
    for pixel in image.pixels_mut() {
        let gray = luma(pixel).round();
        pixel.apply(|c| clamp_channel(gray + (c as f32 - gray) * saturation as f32));
    }

    operations.push(format!(
        "color_jitter(brightness={brightness:.3}, contrast={contrast:.3}, saturation={saturation:.3})"
    ));
}

// ============================================================================
// Noise
// ============================================================================

fn add_noise<R: Rng>(
    image: &mut RgbImage,
    strength: f64,
    rng: &mut R,
    operations: &mut Vec<String>,
) {
    if strength <= 0.0 {
        return;
    }

    let mut bulk = StdRng::seed_from_u64(rng.gen_range(0..=u32::MAX) as u64);
    let amplitude = (strength * 255.0) as f32;
    for channel in image.iter_mut() {
        let noisy = *channel as f32 + bulk.gen_range(-1.0f32..1.0) * amplitude;
        *channel = noisy.clamp(0.0, 255.0) as u8;
    }

    operations.push(format!("noise(strength={strength:.3})"));
}

// ============================================================================
// Rotation
// ============================================================================

/// Center `image` on a `fill` canvas large enough to hold it rotated by
/// `degrees`, so the rotation that follows clips nothing.
fn pad_for_rotation<P: Pixel>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    degrees: f64,
    fill: P,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (width, height) = image.dimensions();
    let rotated = rotated_bounds((width, height), degrees);
    // Content must fit both before and after turning about the shared center
    let bounds = (rotated.0.max(width), rotated.1.max(height));
    let mut padded = ImageBuffer::from_pixel(bounds.0, bounds.1, fill);
    let (x, y) = center_offset(bounds, image.dimensions());
    imageops::replace(&mut padded, image, x as i64, y as i64);
    padded
}

/// `rotate_about_center` turns clockwise; positive angles here turn
/// counter-clockwise.
fn clockwise_radians(degrees: f64) -> f32 {
    -(degrees.to_radians() as f32)
}

fn rotate_and_crop<R: Rng>(
    image: RgbImage,
    range: (f64, f64),
    crop_margin: f64,
    rng: &mut R,
    operations: &mut Vec<String>,
) -> RgbImage {
    let angle = uniform(rng, range);
    if angle.abs() < MIN_ROTATION {
        return image;
    }

    let (width, height) = image.dimensions();
    let (big_w, big_h) = scale_dimensions((width, height), 1.0 + crop_margin.max(0.0));
    let enlarged = DynamicImage::ImageRgb8(image)
        .resize_to_fill(big_w, big_h, FilterType::Lanczos3)
        .into_rgb8();

    let black = Rgb([0, 0, 0]);
    let padded = pad_for_rotation(&enlarged, angle, black);
    let rotated = rotate_about_center(&padded, clockwise_radians(angle), Interpolation::Bicubic, black);
    let fitted = DynamicImage::ImageRgb8(rotated)
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .into_rgb8();

    operations.push(format!("rotate(angle={angle:.3})"));
    fitted
}

// ============================================================================
// Texture
// ============================================================================

fn apply_texture(image: RgbImage, texture: &TextureConfig, operations: &mut Vec<String>) -> RgbImage {
    let Some(path) = &texture.image_path else {
        return image;
    };
    let opacity = texture.opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return image;
    }

    let overlay = match image::open(path) {
        Ok(overlay) => overlay,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Skipping unreadable texture image");
            return image;
        }
    };
    let (width, height) = image.dimensions();
    let overlay = overlay
        .resize_to_fill(width, height, FilterType::Lanczos3)
        .into_rgb8();

    let weight = opacity as f32;
    let blended = RgbImage::from_fn(width, height, |x, y| {
        let base = image.get_pixel(x, y);
        let top = overlay.get_pixel(x, y);
        base.map2(top, |a, b| clamp_channel(a as f32 * (1.0 - weight) + b as f32 * weight))
    });

    operations.push(format!("texture(opacity={opacity:.3})"));
    blended
}

// ============================================================================
// Watermarks
// ============================================================================

fn apply_watermarks<R: Rng>(
    image: RgbImage,
    config: &WatermarkConfig,
    rng: &mut R,
    operations: &mut Vec<String>,
) -> Result<RgbImage, AntiDedupError> {
    let opacity_range = checked_range("anti_dedup.watermark.opacity_range", config.opacity_range)?;
    let rotation_range =
        checked_range("anti_dedup.watermark.rotation_range", config.rotation_range)?;
    let scale_range = checked_range("anti_dedup.watermark.scale_range", config.scale_range)?;

    let (count_min, count_max) = normalized(config.count_range);
    let count = rng.gen_range(count_min..=count_max);
    let text = if config.text.is_empty() {
        DEFAULT_WATERMARK_TEXT
    } else {
        config.text.as_str()
    };

    let (width, height) = image.dimensions();
    let mut layer = RgbaImage::new(width, height);

    for _ in 0..count {
        let opacity = uniform(rng, opacity_range).clamp(0.0, 1.0);
        let rotation = uniform(rng, rotation_range);
        let scale = uniform(rng, scale_range);

        let alpha = (255.0 * opacity) as u8;
        let stamp = glyphs::render_text(text, WATERMARK_DOT, Rgba([255, 255, 255, alpha]));
        let target = (
            ((stamp.width() as f64 * (0.5 + scale)) as u32).max(1),
            ((stamp.height() as f64 * (0.5 + scale)) as u32).max(1),
        );
        let (fit_w, fit_h) = calculate_contain_dimensions(stamp.dimensions(), target);
        let scaled = imageops::resize(&stamp, fit_w, fit_h, FilterType::Lanczos3);
        let clear = Rgba([0, 0, 0, 0]);
        let padded = pad_for_rotation(&scaled, rotation, clear);
        let rotated =
            rotate_about_center(&padded, clockwise_radians(rotation), Interpolation::Nearest, clear);

        let max_x = width.saturating_sub(rotated.width()).max(1);
        let max_y = height.saturating_sub(rotated.height()).max(1);
        let x = rng.gen_range(0..=max_x);
        let y = rng.gen_range(0..=max_y);
        imageops::overlay(&mut layer, &rotated, x as i64, y as i64);
    }

    let mut base = DynamicImage::ImageRgb8(image).into_rgba8();
    imageops::overlay(&mut base, &layer, 0, 0);

    operations.push(format!("watermark(count={count})"));
    Ok(DynamicImage::ImageRgba8(base).into_rgb8())
}

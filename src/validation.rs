//! Similarity metrics between a source image and its processed output.
//!
//! Both metrics are informational: they land in the report so a run can be
//! audited, and never change an outcome's status.
//!
//! - **pHash distance**: Hamming distance between DCT mean hashes (64 bits).
//!   0 means perceptually identical.
//! - **SSIM**: a single global structural-similarity score over grayscale
//!   versions of both images, the original resized to the output's size.
//!   1.0 means identical, clamped to `[-1, 1]`.

use image::imageops::FilterType;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig};
use std::sync::OnceLock;

/// Stabilizers from the standard SSIM definition for 8-bit data.
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub phash_distance: u32,
    pub ssim: f64,
}

/// Compute both metrics.
pub fn compare(original: &DynamicImage, processed: &DynamicImage) -> Similarity {
    Similarity {
        phash_distance: phash_distance(original, processed),
        ssim: global_ssim(original, processed),
    }
}

/// Shared DCT mean hasher, configured on first use.
fn phash_hasher() -> &'static Hasher {
    static HASHER: OnceLock<Hasher> = OnceLock::new();
    HASHER.get_or_init(|| {
        HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .hash_size(8, 8)
            .to_hasher()
    })
}

/// Hamming distance between the perceptual hashes of two images.
pub fn phash_distance(a: &DynamicImage, b: &DynamicImage) -> u32 {
    let hasher = phash_hasher();
    hasher.hash_image(a).dist(&hasher.hash_image(b))
}

/// Global SSIM of `original` against `processed`, computed at the size of
/// `processed`.
pub fn global_ssim(original: &DynamicImage, processed: &DynamicImage) -> f64 {
    let (width, height) = (processed.width(), processed.height());
    if width == 0 || height == 0 {
        return 0.0;
    }

    let a = original
        .resize_exact(width, height, FilterType::Lanczos3)
        .into_luma8();
    let b = processed.to_luma8();
    let n = (width as f64) * (height as f64);

    let mean = |img: &image::GrayImage| img.iter().map(|&v| v as f64).sum::<f64>() / n;
    let (mu_a, mu_b) = (mean(&a), mean(&b));

    let (mut var_a, mut var_b, mut covariance) = (0.0, 0.0, 0.0);
    for (&pa, &pb) in a.iter().zip(b.iter()) {
        let da = pa as f64 - mu_a;
        let db = pb as f64 - mu_b;
        var_a += da * da;
        var_b += db * db;
        covariance += da * db;
    }
    var_a /= n;
    var_b /= n;
    covariance /= n;

    let numerator = (2.0 * mu_a * mu_b + C1) * (2.0 * covariance + C2);
    let denominator = (mu_a * mu_a + mu_b * mu_b + C1) * (var_a + var_b + C2);
    if denominator == 0.0 {
        return 0.0;
    }
    (numerator / denominator).clamp(-1.0, 1.0)
}

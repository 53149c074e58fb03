//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Relative tolerance used when deciding whether an image already has the
/// target aspect ratio.
pub const RATIO_TOLERANCE: f64 = 0.01;

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Calculate the output canvas from an aspect ratio and a minimum size.
///
/// Returns the smallest `(width, height)` whose ratio is exactly
/// `aspect.0 : aspect.1` and which is at least `min_size` in both axes.
/// Both inputs must be non-zero.
///
/// # Examples
/// ```
/// # use restyle::imaging::calculations::compute_target_size;
/// assert_eq!(compute_target_size((1, 1), (800, 800)), (800, 800));
/// assert_eq!(compute_target_size((16, 9), (1000, 1000)), (1792, 1008));
/// ```
pub fn compute_target_size(aspect: (u32, u32), min_size: (u32, u32)) -> (u32, u32) {
    let divisor = gcd(aspect.0, aspect.1).max(1);
    let (ratio_w, ratio_h) = (aspect.0 / divisor, aspect.1 / divisor);
    let multiple = min_size.0.div_ceil(ratio_w).max(min_size.1.div_ceil(ratio_h));
    (ratio_w * multiple, ratio_h * multiple)
}

/// Whether `width / height` equals `aspect` within [`RATIO_TOLERANCE`] (relative).
pub fn ratio_matches(size: (u32, u32), aspect: (u32, u32)) -> bool {
    let (width, height) = size;
    if width == 0 || height == 0 || aspect.0 == 0 || aspect.1 == 0 {
        return false;
    }
    let expected = aspect.0 as f64 / aspect.1 as f64;
    let actual = width as f64 / height as f64;
    (actual / expected - 1.0).abs() <= RATIO_TOLERANCE
}

/// Whether an image of `size` must be resized to satisfy `aspect` and `min_size`.
pub fn needs_resize(size: (u32, u32), aspect: (u32, u32), min_size: (u32, u32)) -> bool {
    let meets_min = size.0 >= min_size.0 && size.1 >= min_size.1;
    !(meets_min && ratio_matches(size, aspect))
}

/// Calculate the largest size that fits inside `target` with the source aspect ratio.
///
/// One dimension matches the target exactly, the other is equal or smaller.
/// Never returns a zero dimension.
pub fn calculate_contain_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let w = tgt_w;
        let h = ((w as f64 / src_aspect).round() as u32).clamp(1, tgt_h);
        (w, h)
    } else {
        let h = tgt_h;
        let w = ((h as f64 * src_aspect).round() as u32).clamp(1, tgt_w);
        (w, h)
    }
}

/// Offset that centers `inner` inside `outer` (floored).
pub fn center_offset(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Scale both dimensions by `factor`, rounding, never below 1.
pub fn scale_dimensions(size: (u32, u32), factor: f64) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * factor).round() as u32).max(1);
    (scale(size.0), scale(size.1))
}

/// Bounding box of a `width × height` rectangle rotated by `degrees`.
///
/// This is the canvas an expanding rotation needs so no content is clipped.
pub fn rotated_bounds(size: (u32, u32), degrees: f64) -> (u32, u32) {
    let (w, h) = (size.0 as f64, size.1 as f64);
    let radians = degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    // Trim float noise so a 0° or 90° rotation doesn't grow by a pixel.
    let bound = |v: f64| ((v - 1e-6).ceil() as u32).max(1);
    (bound(w * cos + h * sin), bound(w * sin + h * cos))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // compute_target_size tests
    // =========================================================================

    #[test]
    fn target_square_default() {
        assert_eq!(compute_target_size((1, 1), (800, 800)), (800, 800));
    }

    #[test]
    fn target_square_from_uneven_minimum() {
        assert_eq!(compute_target_size((1, 1), (640, 900)), (900, 900));
    }

    #[test]
    fn target_portrait_ratio() {
        // 3:4 with at least 600x600 → 600x800
        assert_eq!(compute_target_size((3, 4), (600, 600)), (600, 800));
    }

    #[test]
    fn target_reduces_ratio_before_scaling() {
        // 2:2 is 1:1, so 150x150 is reachable exactly
        assert_eq!(compute_target_size((2, 2), (151, 150)), (151, 151));
    }

    #[test]
    fn target_keeps_exact_ratio_and_minimum() {
        for aspect in [(1, 1), (4, 3), (16, 9), (3, 7), (5, 4), (21, 9)] {
            for min in [(1, 1), (100, 100), (800, 800), (1000, 333), (7, 1200)] {
                let (w, h) = compute_target_size(aspect, min);
                assert_eq!(
                    w as u64 * aspect.1 as u64,
                    h as u64 * aspect.0 as u64,
                    "ratio mismatch for {aspect:?} {min:?}"
                );
                assert!(w >= min.0 && h >= min.1, "below minimum for {aspect:?} {min:?}");
            }
        }
    }

    // =========================================================================
    // ratio / resize decision tests
    // =========================================================================

    #[test]
    fn ratio_matches_within_tolerance() {
        assert!(ratio_matches((1000, 1000), (1, 1)));
        assert!(ratio_matches((1005, 1000), (1, 1)));
        assert!(!ratio_matches((1020, 1000), (1, 1)));
        assert!(ratio_matches((1600, 900), (16, 9)));
    }

    #[test]
    fn ratio_matches_rejects_zero() {
        assert!(!ratio_matches((0, 100), (1, 1)));
        assert!(!ratio_matches((100, 100), (0, 1)));
    }

    #[test]
    fn resize_needed_when_too_small() {
        assert!(needs_resize((64, 64), (1, 1), (800, 800)));
    }

    #[test]
    fn resize_needed_when_ratio_wrong() {
        assert!(needs_resize((1600, 900), (1, 1), (800, 800)));
    }

    #[test]
    fn resize_not_needed_when_compliant() {
        assert!(!needs_resize((1200, 1200), (1, 1), (800, 800)));
    }

    // =========================================================================
    // calculate_contain_dimensions tests
    // =========================================================================

    #[test]
    fn contain_portrait_into_square() {
        assert_eq!(calculate_contain_dimensions((40, 80), (100, 100)), (50, 100));
    }

    #[test]
    fn contain_landscape_into_square() {
        assert_eq!(calculate_contain_dimensions((400, 200), (800, 800)), (800, 400));
    }

    #[test]
    fn contain_extreme_ratio_never_zero() {
        assert_eq!(calculate_contain_dimensions((10000, 1), (100, 100)), (100, 1));
    }

    #[test]
    fn center_offset_floors() {
        assert_eq!(center_offset((100, 100), (50, 99)), (25, 0));
        assert_eq!(center_offset((10, 10), (20, 20)), (0, 0));
    }

    // =========================================================================
    // rotation geometry tests
    // =========================================================================

    #[test]
    fn scale_dimensions_rounds() {
        assert_eq!(scale_dimensions((100, 50), 1.01), (101, 51));
        assert_eq!(scale_dimensions((1, 1), 0.1), (1, 1));
    }

    #[test]
    fn rotated_bounds_zero_angle_is_identity() {
        assert_eq!(rotated_bounds((640, 480), 0.0), (640, 480));
    }

    #[test]
    fn rotated_bounds_quarter_turn_swaps() {
        assert_eq!(rotated_bounds((640, 480), 90.0), (480, 640));
    }

    #[test]
    fn rotated_bounds_grows_for_small_angle() {
        let (w, h) = rotated_bounds((100, 100), 1.0);
        assert!(w > 100 && h > 100);
        assert_eq!(w, h);
    }
}

//! Pure calculation functions for output dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Calculate the output size for a source under a longest-side cap.
///
/// Sources that already fit are returned unchanged. Larger sources are scaled
/// by `cap / max(w, h)`: the longer side lands exactly on `cap` and the
/// shorter side is rounded to the nearest pixel, so the aspect ratio is kept
/// to within half a pixel.
///
/// A zero width or height is returned as-is; see [`surface_dimensions`] for
/// the clamp applied before allocating pixels.
///
/// # Examples
/// ```
/// # use compresso::imaging::calculate_target_dimensions;
/// assert_eq!(calculate_target_dimensions(8000, 2000, 4096), (4096, 1024));
/// assert_eq!(calculate_target_dimensions(640, 480, 4096), (640, 480));
/// ```
pub fn calculate_target_dimensions(width: u32, height: u32, cap: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= cap && height <= cap {
        return (width, height);
    }

    let scale = cap as f64 / width.max(height) as f64;
    if width >= height {
        // Landscape or square
        let h = (height as f64 * scale).round() as u32;
        (cap, h)
    } else {
        // Portrait
        let w = (width as f64 * scale).round() as u32;
        (w, cap)
    }
}

/// Target dimensions for a source, derived with [`calculate_target_dimensions`].
pub fn target_for(source: Dimensions, cap: u32) -> Dimensions {
    let (width, height) = calculate_target_dimensions(source.width, source.height, cap);
    Dimensions { width, height }
}

/// Clamp target dimensions so a rendering surface always has at least one
/// pixel on each side.
pub fn surface_dimensions(target: Dimensions) -> Dimensions {
    Dimensions {
        width: target.width.max(1),
        height: target.height.max(1),
    }
}

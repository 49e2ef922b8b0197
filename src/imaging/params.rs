//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the job runner (which decides what to render and encode)
//! and the [`backend`](super::backend) (which does the pixel work), so a mock
//! backend can be swapped in without changing job logic.
//!
//! ## Types
//!
//! - [`EncodeQuality`]: Encoder quality factor, clamped to `[0.05, 1.0]` on construction.
//! - [`RenderParams`]: Target surface size, output format, and resampling filter.
//! - [`EncodeParams`]: Output format, quality, and AVIF speed.

use image::imageops::FilterType;

use super::backend::Dimensions;
use crate::types::OutputFormat;

/// Quality factor handed to an encoder.
///
/// Callers may pass anything; the value is clamped to `[0.05, 1.0]` so a
/// zero or negative request can never reach a codec. NaN is treated as the
/// minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeQuality(f32);

impl EncodeQuality {
    pub const MIN: f32 = 0.05;
    pub const MAX: f32 = 1.0;

    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(Self::MIN);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Quality as the 1-100 integer most codecs take.
    pub fn percent(self) -> u8 {
        ((self.0 * 100.0).round() as u8).clamp(1, 100)
    }
}

impl Default for EncodeQuality {
    fn default() -> Self {
        Self(0.7)
    }
}

/// Parameters for drawing a decoded source onto a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// Requested size; sides of zero are clamped to one when allocating.
    pub target: Dimensions,
    pub format: OutputFormat,
    pub filter: FilterType,
}

/// Parameters for serializing a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub format: OutputFormat,
    pub quality: EncodeQuality,
    /// rav1e speed preset, only used for AVIF.
    pub avif_speed: u8,
}

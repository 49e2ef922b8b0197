//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the pipeline needs:
//! identify, decode, render, and encode. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend); tests swap in a
//! recording mock so job control can be exercised without pixel work.

use image::DynamicImage;
use thiserror::Error;

use super::params::{EncodeParams, RenderParams};
use super::surface::Surface;
use crate::types::SourceKind;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Rendering surface unavailable: {0}")]
    Render(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Pixel width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const ZERO: Dimensions = Dimensions {
        width: 0,
        height: 0,
    };

    pub fn is_zero_area(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Trait for image processing backends.
///
/// `Send + Sync` because jobs run on tokio's blocking pool while the pipeline
/// keeps its own handle to the backend.
pub trait ImageBackend: Send + Sync {
    /// Read dimensions from the header only, without a full decode.
    fn identify(&self, bytes: &[u8], kind: SourceKind) -> Result<Dimensions, BackendError>;

    /// Fully decode the source into pixels.
    fn decode(&self, bytes: &[u8], kind: SourceKind) -> Result<DynamicImage, BackendError>;

    /// Draw a decoded source onto a fresh surface for the output format.
    fn render(&self, image: &DynamicImage, params: &RenderParams) -> Result<Surface, BackendError>;

    /// Serialize a surface into the output format.
    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

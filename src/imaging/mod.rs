//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions`, `avif-parse` |
//! | **Decode** | `image` decoders, `rav1d` for AVIF |
//! | **Render** | stretch-to-fit `resize_exact` + source-over compositing |
//! | **Encode** | `image::codecs` (JPEG, PNG, WebP lossless, AVIF via rav1e) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Surface**: The RGBA canvas sources are composited onto
//! - **Encoder**: Ordered encode strategies (direct, data-URL fallback)
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

mod avif;
pub mod backend;
mod calculations;
pub mod encoder;
pub mod operations;
mod params;
pub mod rust_backend;
mod surface;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_target_dimensions, surface_dimensions, target_for};
pub use encoder::{DataUrlRoundTrip, DirectEncode, EncodeStrategy, Encoder};
pub use operations::{CompressRequest, EncodedImage, compress, probe_dimensions};
pub use params::{EncodeParams, EncodeQuality, RenderParams};
pub use rust_backend::RustBackend;
pub use surface::Surface;

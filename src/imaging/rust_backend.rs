//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (JPEG, PNG, WebP) | `image::ImageReader::into_dimensions` (header only) |
//! | Identify (AVIF) | `avif-parse` container metadata |
//! | Decode (JPEG, PNG, WebP) | `image` crate, format guessed from content |
//! | Decode (AVIF) | `avif-parse` (container) + `rav1d` (AV1 decode) |
//! | Render | [`Surface`] compositing + `DynamicImage::resize_exact` |
//! | Encode | [`Encoder`] strategy list over `image::codecs::*` |

use image::{DynamicImage, ImageReader};
use std::io::Cursor;

use super::avif::{decode_avif, identify_avif};
use super::backend::{BackendError, Dimensions, ImageBackend};
use super::encoder::Encoder;
use super::params::{EncodeParams, RenderParams};
use super::surface::Surface;
use crate::types::SourceKind;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    encoder: Encoder,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_encoder(Encoder::standard())
    }

    /// Backend with a custom encoder strategy list.
    pub fn with_encoder(encoder: Encoder) -> Self {
        Self { encoder }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8], kind: SourceKind) -> Result<Dimensions, BackendError> {
        if kind == SourceKind::Avif {
            return identify_avif(bytes);
        }
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), kind.image_format())
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8], kind: SourceKind) -> Result<DynamicImage, BackendError> {
        if kind == SourceKind::Avif {
            return decode_avif(bytes);
        }
        // Trust the content over the declared type: mislabeled files still decode.
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {}", e)))?
            .decode()
            .map_err(|e| {
                BackendError::Decode(format!("Failed to decode {} source: {}", kind.mime(), e))
            })
    }

    fn render(&self, image: &DynamicImage, params: &RenderParams) -> Result<Surface, BackendError> {
        let mut surface = Surface::for_format(params.target, params.format);
        surface.draw_stretched(image, params.filter);
        Ok(surface)
    }

    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        self.encoder.encode(surface, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::EncodeQuality;
    use crate::test_helpers::{avif_bytes, jpeg_bytes, png_with_alpha_bytes};
    use crate::types::OutputFormat;

    fn render_params(width: u32, height: u32, format: OutputFormat) -> RenderParams {
        RenderParams {
            target: Dimensions { width, height },
            format,
            filter: image::imageops::FilterType::Lanczos3,
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let backend = RustBackend::new();
        let dims = backend
            .identify(&jpeg_bytes(200, 150), SourceKind::Jpeg)
            .unwrap();
        assert_eq!(dims.width, 200);
        assert_eq!(dims.height, 150);
    }

    #[test]
    fn identify_synthetic_png() {
        let backend = RustBackend::new();
        let dims = backend
            .identify(&png_with_alpha_bytes(31, 17), SourceKind::Png)
            .unwrap();
        assert_eq!((dims.width, dims.height), (31, 17));
    }

    #[test]
    fn identify_avif_uses_container() {
        let backend = RustBackend::new();
        let dims = backend.identify(&avif_bytes(40, 30), SourceKind::Avif).unwrap();
        assert_eq!((dims.width, dims.height), (40, 30));
    }

    #[test]
    fn identify_garbage_errors() {
        let backend = RustBackend::new();
        assert!(backend.identify(b"not an image", SourceKind::Png).is_err());
    }

    #[test]
    fn identify_mislabeled_fails_but_decode_succeeds() {
        // PNG bytes declared as JPEG: the header path trusts the label, the
        // full decode sniffs the content.
        let backend = RustBackend::new();
        let bytes = png_with_alpha_bytes(12, 9);
        assert!(backend.identify(&bytes, SourceKind::Jpeg).is_err());
        let decoded = backend.decode(&bytes, SourceKind::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 9));
    }

    #[test]
    fn decode_avif_source() {
        let backend = RustBackend::new();
        let decoded = backend.decode(&avif_bytes(24, 16), SourceKind::Avif).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (24, 16));
    }

    #[test]
    fn render_produces_exact_target() {
        let backend = RustBackend::new();
        let image = backend.decode(&jpeg_bytes(400, 300), SourceKind::Jpeg).unwrap();
        let surface = backend
            .render(&image, &render_params(123, 45, OutputFormat::Webp))
            .unwrap();
        assert_eq!(surface.dimensions(), Dimensions { width: 123, height: 45 });
    }

    #[test]
    fn render_jpeg_flattens_transparency_to_white() {
        let backend = RustBackend::new();
        let image = backend
            .decode(&png_with_alpha_bytes(20, 20), SourceKind::Png)
            .unwrap();
        let surface = backend
            .render(&image, &render_params(20, 20, OutputFormat::Jpeg))
            .unwrap();
        // Left half of the helper image is fully transparent.
        assert_eq!(surface.pixels().get_pixel(0, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn render_then_encode_jpeg_payload() {
        let backend = RustBackend::new();
        let image = backend.decode(&jpeg_bytes(64, 64), SourceKind::Jpeg).unwrap();
        let surface = backend
            .render(&image, &render_params(32, 32, OutputFormat::Jpeg))
            .unwrap();
        let bytes = backend
            .encode(
                &surface,
                &EncodeParams {
                    format: OutputFormat::Jpeg,
                    quality: EncodeQuality::new(0.7),
                    avif_speed: 10,
                },
            )
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 32));
    }
}

//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they take the
//! job settings, compute parameters, and call the backend.

use image::imageops::FilterType;
use image::GenericImageView;

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{surface_dimensions, target_for};
use super::params::{EncodeParams, EncodeQuality, RenderParams};
use crate::types::{OutputFormat, OutputSpec, SourceKind};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Report source dimensions, best effort.
///
/// Reads the header first; when that fails, decodes the whole image. If both
/// fail the result is `{0, 0}`: dimensions are advisory and a failed probe
/// must not stop the pipeline.
pub fn probe_dimensions<B>(backend: &B, bytes: &[u8], kind: SourceKind) -> Dimensions
where
    B: ImageBackend + ?Sized,
{
    match backend.identify(bytes, kind) {
        Ok(dims) => return dims,
        Err(err) => log::debug!("header probe failed for {}: {}", kind.mime(), err),
    }
    match backend.decode(bytes, kind) {
        Ok(image) => {
            let (width, height) = image.dimensions();
            Dimensions { width, height }
        }
        Err(err) => {
            log::warn!("could not determine dimensions of {} source: {}", kind.mime(), err);
            Dimensions::ZERO
        }
    }
}

/// Everything a compression job needs besides the source bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressRequest {
    pub kind: SourceKind,
    pub spec: OutputSpec,
    pub max_dimension: u32,
    pub filter: FilterType,
    pub avif_speed: u8,
}

impl CompressRequest {
    /// Render parameters for a decoded source of the given size.
    pub fn render_params(&self, source: Dimensions) -> RenderParams {
        RenderParams {
            target: target_for(source, self.max_dimension),
            format: self.spec.format,
            filter: self.filter,
        }
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.spec.format,
            quality: EncodeQuality::new(self.spec.quality.as_factor()),
            avif_speed: self.avif_speed,
        }
    }
}

/// Encoded output of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub payload: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Decode, render, and encode one source.
///
/// The target size is computed from the decoded pixels rather than the probe,
/// since a failed probe reports `{0, 0}`.
pub fn compress<B>(backend: &B, bytes: &[u8], request: &CompressRequest) -> Result<EncodedImage>
where
    B: ImageBackend + ?Sized,
{
    let decoded = backend.decode(bytes, request.kind)?;
    let (width, height) = decoded.dimensions();
    let source = Dimensions { width, height };
    if source.is_zero_area() {
        log::warn!(
            "{} source decoded to {}x{}, rendering a minimal surface",
            request.kind.mime(),
            width,
            height
        );
    }
    let render = request.render_params(source);
    let surface = backend.render(&decoded, &render)?;
    drop(decoded);

    let payload = backend.encode(&surface, &request.encode_params())?;
    if payload.is_empty() {
        return Err(BackendError::Encode("encoder returned an empty payload".into()));
    }
    let size = surface_dimensions(render.target);
    Ok(EncodedImage {
        payload,
        format: request.spec.format,
        width: size.width,
        height: size.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::types::QualityPercent;

    fn request(format: OutputFormat, quality: u8) -> CompressRequest {
        CompressRequest {
            kind: SourceKind::Jpeg,
            spec: OutputSpec {
                format,
                quality: QualityPercent::new(quality),
            },
            max_dimension: 4096,
            filter: FilterType::Triangle,
            avif_speed: 6,
        }
    }

    #[test]
    fn probe_uses_header_when_available() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 8000,
            height: 2000,
        });
        let dims = probe_dimensions(&backend, b"", SourceKind::Jpeg);
        assert_eq!(
            dims,
            Dimensions {
                width: 8000,
                height: 2000
            }
        );
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Identify(SourceKind::Jpeg)]
        );
    }

    #[test]
    fn probe_falls_back_to_full_decode() {
        let backend = MockBackend::new();
        *backend.decode_result.lock().unwrap() = Some(Dimensions {
            width: 6,
            height: 4,
        });
        let dims = probe_dimensions(&backend, b"", SourceKind::Png);
        assert_eq!(
            dims,
            Dimensions {
                width: 6,
                height: 4
            }
        );
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Identify(SourceKind::Png),
                RecordedOp::Decode(SourceKind::Png)
            ]
        );
    }

    #[test]
    fn probe_failure_yields_zero() {
        let backend = MockBackend::new();
        assert_eq!(
            probe_dimensions(&backend, b"garbage", SourceKind::Webp),
            Dimensions::ZERO
        );
    }

    #[test]
    fn encode_params_carry_quality_factor() {
        let params = request(OutputFormat::Avif, 90).encode_params();
        assert_eq!(params.format, OutputFormat::Avif);
        assert_eq!(params.quality.percent(), 90);
        assert_eq!(params.avif_speed, 6);
    }

    #[test]
    fn render_params_apply_cap() {
        let params = request(OutputFormat::Jpeg, 70).render_params(Dimensions {
            width: 8000,
            height: 2000,
        });
        assert_eq!(
            params.target,
            Dimensions {
                width: 4096,
                height: 1024
            }
        );
    }

    #[test]
    fn compress_runs_decode_render_encode() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 4,
            height: 2,
        });
        let out = compress(&backend, b"", &request(OutputFormat::Webp, 50)).unwrap();
        assert_eq!(out.format, OutputFormat::Webp);
        assert_eq!(
            backend.get_operations(),
            vec![
                RecordedOp::Decode(SourceKind::Jpeg),
                RecordedOp::Render {
                    width: 4,
                    height: 2,
                    format: OutputFormat::Webp
                },
                RecordedOp::Encode {
                    format: OutputFormat::Webp,
                    quality_percent: 50
                },
            ]
        );
    }

    #[test]
    fn compress_empty_source_yields_one_pixel_output() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 0,
            height: 40,
        });
        let out = compress(&backend, b"", &request(OutputFormat::Png, 70)).unwrap();
        assert_eq!((out.width, out.height), (1, 40));
        assert!(backend.get_operations().contains(&RecordedOp::Render {
            width: 0,
            height: 40,
            format: OutputFormat::Png
        }));
    }

    #[test]
    fn compress_propagates_decode_failure() {
        let backend = MockBackend::new();
        let result = compress(&backend, b"", &request(OutputFormat::Png, 70));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn compress_rejects_empty_payload() {
        let backend = MockBackend::with_dimensions(Dimensions {
            width: 2,
            height: 2,
        });
        backend.push_encode_result(Ok(Vec::new()));
        let result = compress(&backend, b"", &request(OutputFormat::Png, 70));
        assert!(matches!(result, Err(BackendError::Encode(_))));
    }
}

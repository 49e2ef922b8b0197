//! Surface serialization with an ordered list of fallback strategies.
//!
//! | Order | Strategy | Path |
//! |---|---|---|
//! | 1 | [`DirectEncode`] | codec writes straight into a byte buffer |
//! | 2 | [`DataUrlRoundTrip`] | codec writes through a base64 text writer into a `data:` URL, which is parsed back into bytes |
//!
//! The [`Encoder`] tries each strategy in turn. A strategy that errors or
//! produces an empty payload hands over to the next one; only when every
//! strategy has been tried does encoding fail.
//!
//! ## Quality per format
//!
//! | Format | Codec | Quality |
//! |---|---|---|
//! | JPEG | `image::codecs::jpeg::JpegEncoder` | used (1-100) |
//! | AVIF | `image::codecs::avif::AvifEncoder` (rav1e) | used, with configured speed |
//! | PNG | `image::codecs::png::PngEncoder` | accepted, ignored (lossless) |
//! | WEBP | `image::codecs::webp::WebPEncoder` | used: RGB is posterized to fewer levels below 100, then encoded losslessly |
//!
//! The `image` crate only writes lossless WebP. Lower quality therefore trades
//! color depth for size: fewer distinct levels per channel compress better.
//! Alpha is never touched.

use base64::engine::general_purpose::STANDARD;
use base64::write::EncoderStringWriter;
use base64::Engine as _;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::io::Write;

use super::backend::BackendError;
use super::params::EncodeParams;
use super::surface::Surface;
use crate::types::OutputFormat;

/// One way of turning a surface into an encoded payload.
pub trait EncodeStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Encode the surface. An empty vector means "no payload".
    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}

/// Run the codec for `params.format` into any writer.
fn write_encoded<W: Write>(
    writer: W,
    image: &DynamicImage,
    params: &EncodeParams,
) -> Result<(), BackendError> {
    let result = match params.format {
        OutputFormat::Jpeg => {
            image.write_with_encoder(JpegEncoder::new_with_quality(writer, params.quality.percent()))
        }
        OutputFormat::Png => image.write_with_encoder(PngEncoder::new(writer)),
        OutputFormat::Webp => {
            let mut rgba = image.to_rgba8();
            posterize_rgb(&mut rgba, webp_levels(params.quality.percent()));
            DynamicImage::ImageRgba8(rgba).write_with_encoder(WebPEncoder::new_lossless(writer))
        }
        OutputFormat::Avif => image.write_with_encoder(AvifEncoder::new_with_speed_quality(
            writer,
            params.avif_speed,
            params.quality.percent(),
        )),
    };
    result.map_err(|e| {
        BackendError::Encode(format!(
            "{} encode failed: {}",
            params.format.extension(),
            e
        ))
    })
}

/// Distinct values per color channel kept at a WEBP quality percent.
///
/// Quadratic in quality, so the top of the range stays close to full depth
/// while low settings collapse to a handful of levels.
fn webp_levels(quality_percent: u8) -> u16 {
    if quality_percent >= 100 {
        return 256;
    }
    let q = f32::from(quality_percent.max(1)) / 100.0;
    (2.0 + q * q * 254.0).round().clamp(2.0, 256.0) as u16
}

/// Snap the RGB channels of packed RGBA pixels onto `levels` evenly spaced
/// values. Alpha is left as is.
fn posterize_rgb(pixels: &mut [u8], levels: u16) {
    if levels >= 256 {
        return;
    }
    let step = 255.0 / f32::from(levels.max(2) - 1);
    for pixel in pixels.chunks_exact_mut(4) {
        for channel in &mut pixel[..3] {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Primary path: serialize the surface directly to bytes.
pub struct DirectEncode;

impl EncodeStrategy for DirectEncode {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        write_encoded(&mut buf, &surface.to_encodable(), params)?;
        Ok(buf)
    }
}

/// Fallback path: produce a textual `data:` URL, then decode it back.
pub struct DataUrlRoundTrip;

impl DataUrlRoundTrip {
    /// Encode the surface as `data:<mime>;base64,<payload>`.
    pub fn to_data_url(surface: &Surface, params: &EncodeParams) -> Result<String, BackendError> {
        let prefix = format!("data:{};base64,", params.format.mime());
        let mut text = EncoderStringWriter::from_consumer(prefix, &STANDARD);
        write_encoded(&mut text, &surface.to_encodable(), params)?;
        Ok(text.into_inner())
    }
}

impl EncodeStrategy for DataUrlRoundTrip {
    fn name(&self) -> &'static str {
        "data-url"
    }

    fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let url = Self::to_data_url(surface, params)?;
        let (_mime, bytes) = parse_data_url(&url)?;
        Ok(bytes)
    }
}

/// Split a base64 `data:` URL into its mime type and decoded bytes.
pub fn parse_data_url(url: &str) -> Result<(String, Vec<u8>), BackendError> {
    let rest = url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| BackendError::Encode("not a data URL".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| BackendError::Encode("data URL is missing the base64 marker".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| BackendError::Encode(format!("invalid base64 in data URL: {}", e)))?;
    Ok((mime.to_string(), bytes))
}

/// Ordered strategy list.
pub struct Encoder {
    strategies: Vec<Box<dyn EncodeStrategy>>,
}

impl Encoder {
    pub fn new(strategies: Vec<Box<dyn EncodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Direct encode first, data-URL round trip second.
    ///
    /// Both run the same codec, so for the built-in formats the second entry
    /// only recovers from an empty buffer. The list is open for injected
    /// strategies through [`Encoder::new`].
    pub fn standard() -> Self {
        Self::new(vec![Box::new(DirectEncode), Box::new(DataUrlRoundTrip)])
    }

    /// Try every strategy in order until one yields a non-empty payload.
    pub fn encode(&self, surface: &Surface, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let mut last_error = None;
        for strategy in &self.strategies {
            match strategy.encode(surface, params) {
                Ok(bytes) if !bytes.is_empty() => {
                    log::debug!(
                        "encoded {} via {} ({} bytes)",
                        params.format.extension(),
                        strategy.name(),
                        bytes.len()
                    );
                    return Ok(bytes);
                }
                Ok(_) => {
                    log::warn!("encode strategy {} produced no payload", strategy.name());
                }
                Err(err) => {
                    log::warn!("encode strategy {} failed: {}", strategy.name(), err);
                    last_error = Some(err);
                }
            }
        }
        Err(match last_error {
            Some(err) => err,
            None => BackendError::Encode(format!(
                "no strategy produced a {} payload",
                params.format.extension()
            )),
        })
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::standard()
    }
}

//! Rendering surface: the RGBA canvas a source is drawn onto before encoding.

use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};

use super::backend::Dimensions;
use super::calculations::surface_dimensions;
use crate::types::OutputFormat;

const OPAQUE_WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// An addressable RGBA pixel buffer.
///
/// The surface remembers whether it was prepared for an alpha-less format, so
/// encoders know to drop the alpha channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pixels: RgbaImage,
    opaque: bool,
}

impl Surface {
    /// Allocate a blank surface suited to `format`.
    ///
    /// JPEG surfaces start opaque white so transparent source pixels end up
    /// white. All other formats start fully transparent.
    pub fn for_format(target: Dimensions, format: OutputFormat) -> Self {
        let Dimensions { width, height } = surface_dimensions(target);
        if format.supports_alpha() {
            Self {
                pixels: RgbaImage::new(width, height),
                opaque: false,
            }
        } else {
            Self {
                pixels: RgbaImage::from_pixel(width, height, OPAQUE_WHITE),
                opaque: true,
            }
        }
    }

    /// Draw `source` stretched to cover the whole surface, compositing its
    /// alpha over the current background.
    pub fn draw_stretched(&mut self, source: &DynamicImage, filter: FilterType) {
        let (width, height) = self.pixels.dimensions();
        let scaled = if source.width() == width && source.height() == height {
            source.to_rgba8()
        } else {
            source.resize_exact(width, height, filter).to_rgba8()
        };
        for (dst, src) in self.pixels.pixels_mut().zip(scaled.pixels()) {
            *dst = source_over(*dst, *src);
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        let (width, height) = self.pixels.dimensions();
        Dimensions { width, height }
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Image view handed to codecs: RGB for opaque surfaces, RGBA otherwise.
    pub fn to_encodable(&self) -> DynamicImage {
        let rgba = DynamicImage::ImageRgba8(self.pixels.clone());
        if self.opaque {
            DynamicImage::ImageRgb8(rgba.to_rgb8())
        } else {
            rgba
        }
    }
}

/// Porter-Duff source-over in 8-bit integer math.
///
/// Fully opaque and fully transparent sources are exact: the former replaces
/// the destination, the latter leaves it untouched.
fn source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src.0[3] as u32;
    match sa {
        0 => dst,
        255 => src,
        _ => {
            let da = dst.0[3] as u32;
            // out_a = sa + da * (1 - sa), scaled by 255
            let out_a = sa * 255 + da * (255 - sa);
            if out_a == 0 {
                return Rgba([0, 0, 0, 0]);
            }
            let mut out = [0u8; 4];
            for i in 0..3 {
                let premul = src.0[i] as u32 * sa * 255 + dst.0[i] as u32 * da * (255 - sa);
                out[i] = ((premul + out_a / 2) / out_a) as u8;
            }
            out[3] = ((out_a + 127) / 255) as u8;
            Rgba(out)
        }
    }
}

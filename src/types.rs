//! Shared types used across the imaging layer and the pipeline.
//!
//! These are the user-facing value types: which kinds of source image are
//! accepted, which output formats can be produced, and the settings that
//! drive a compression job.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Accepted source image kinds, keyed by declared mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl SourceKind {
    /// Resolve a declared mime type. `image/jpg` is accepted as an alias of
    /// `image/jpeg`; anything outside the four supported kinds is `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            "image/avif" => Some(Self::Avif),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// Decoder hint for the `image` crate.
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Webp => ImageFormat::WebP,
            Self::Avif => ImageFormat::Avif,
        }
    }
}

/// Output encodings the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[default]
    Jpeg,
    Webp,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [Self::Png, Self::Jpeg, Self::Webp, Self::Avif];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
        }
    }

    /// File extension used for downloads.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Avif => "avif",
        }
    }

    /// JPEG has no alpha channel; everything else keeps transparency.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Output format picked when a new source is selected.
    ///
    /// JPEG sources stay JPEG. Every other accepted kind may carry
    /// transparency, so it defaults to WEBP.
    pub fn default_for(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Jpeg => Self::Jpeg,
            SourceKind::Png | SourceKind::Webp | SourceKind::Avif => Self::Webp,
        }
    }
}

/// User-facing quality setting, in percent (10-100, default 70).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPercent(u8);

impl QualityPercent {
    pub const MIN: u8 = 10;
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Quality as the `[0, 1]` factor handed to the encoder.
    pub fn as_factor(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for QualityPercent {
    fn default() -> Self {
        Self(70)
    }
}

/// Quick quality shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    Medium,
    High,
}

impl QualityPreset {
    pub fn quality(self) -> QualityPercent {
        match self {
            Self::Low => QualityPercent::new(50),
            Self::Medium => QualityPercent::new(70),
            Self::High => QualityPercent::new(90),
        }
    }
}

/// Output format and quality for the next job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSpec {
    pub format: OutputFormat,
    pub quality: QualityPercent,
}

/// Where the pipeline is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Ready,
    Compressing,
    Done,
    Error,
}

impl PipelineStatus {
    /// A source is loaded and settings changes should schedule work.
    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_parsing_accepts_jpg_alias() {
        assert_eq!(SourceKind::from_mime("image/jpg"), Some(SourceKind::Jpeg));
        assert_eq!(SourceKind::from_mime("image/jpeg"), Some(SourceKind::Jpeg));
        assert_eq!(SourceKind::from_mime(" IMAGE/PNG "), Some(SourceKind::Png));
        assert_eq!(SourceKind::from_mime("image/avif"), Some(SourceKind::Avif));
    }

    #[test]
    fn mime_parsing_rejects_other_types() {
        assert_eq!(SourceKind::from_mime("image/gif"), None);
        assert_eq!(SourceKind::from_mime("image/tiff"), None);
        assert_eq!(SourceKind::from_mime("application/pdf"), None);
        assert_eq!(SourceKind::from_mime(""), None);
    }

    #[test]
    fn output_extensions() {
        let exts: Vec<_> = OutputFormat::ALL.iter().map(|f| f.extension()).collect();
        assert_eq!(exts, vec!["png", "jpg", "webp", "avif"]);
    }

    #[test]
    fn only_jpeg_lacks_alpha() {
        assert!(!OutputFormat::Jpeg.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
        assert!(OutputFormat::Webp.supports_alpha());
        assert!(OutputFormat::Avif.supports_alpha());
    }

    #[test]
    fn default_format_follows_source_kind() {
        assert_eq!(OutputFormat::default_for(SourceKind::Jpeg), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::default_for(SourceKind::Png), OutputFormat::Webp);
        assert_eq!(OutputFormat::default_for(SourceKind::Avif), OutputFormat::Webp);
    }

    #[test]
    fn quality_percent_clamps_to_slider_range() {
        assert_eq!(QualityPercent::new(0).value(), 10);
        assert_eq!(QualityPercent::new(55).value(), 55);
        assert_eq!(QualityPercent::new(255).value(), 100);
        assert_eq!(QualityPercent::default().value(), 70);
    }

    #[test]
    fn presets_map_to_50_70_90() {
        assert_eq!(QualityPreset::Low.quality().value(), 50);
        assert_eq!(QualityPreset::Medium.quality().value(), 70);
        assert_eq!(QualityPreset::High.quality().value(), 90);
    }

    #[test]
    fn default_output_spec_is_jpeg_70() {
        let spec = OutputSpec::default();
        assert_eq!(spec.format, OutputFormat::Jpeg);
        assert_eq!(spec.quality.value(), 70);
    }

    #[test]
    fn spec_serializes_lowercase_format() {
        let spec = OutputSpec {
            format: OutputFormat::Webp,
            quality: QualityPercent::new(90),
        };
        let toml = toml::to_string(&spec).unwrap();
        assert!(toml.contains("format = \"webp\""));
        assert!(toml.contains("quality = 90"));
    }
}

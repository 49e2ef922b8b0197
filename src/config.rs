//! Pipeline configuration.
//!
//! Tuning knobs for the compression pipeline: the size cap, debounce delay,
//! default quality, progress simulation timings, and encoder settings. The
//! library never reads configuration from disk or the environment; embedders
//! either use [`PipelineConfig::default`] or hand over TOML text through
//! [`PipelineConfig::from_toml_str`].
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! max_dimension = 4096      # Longest output side in pixels
//! debounce_ms = 300         # Quiet period before a settings change starts a job
//! default_quality = 70      # Quality percent restored on reset (10-100)
//!
//! [progress]
//! start = 10                # Value shown as soon as a job starts
//! cap = 90                  # Simulated progress never passes this
//! max_step = 15             # Largest random increment per tick
//! tick_ms = 200             # Tick interval
//! reset_delay_ms = 500      # How long 100 stays visible after completion
//!
//! [encoding]
//! avif_speed = 6            # rav1e speed preset (1 = slowest, 10 = fastest)
//! resize_filter = "lanczos3" # nearest | triangle | catmullrom | gaussian | lanczos3
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::types::QualityPercent;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration.
///
/// All fields have sensible defaults. TOML input needs only the values it
/// wants to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Cap on the longest output side; larger sources are downscaled.
    pub max_dimension: u32,
    /// Debounce window for settings changes, in milliseconds.
    pub debounce_ms: u64,
    /// Quality percent used on startup and after reset.
    pub default_quality: u8,
    /// Simulated progress settings.
    pub progress: ProgressConfig,
    /// Encoder settings.
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: 4096,
            debounce_ms: 300,
            default_quality: 70,
            progress: ProgressConfig::default(),
            encoding: EncodingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse TOML text on top of the stock defaults and validate the result.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "max_dimension must be non-zero".into(),
            ));
        }
        if !(QualityPercent::MIN..=QualityPercent::MAX).contains(&self.default_quality) {
            return Err(ConfigError::Validation(format!(
                "default_quality must be {}-{}",
                QualityPercent::MIN,
                QualityPercent::MAX
            )));
        }
        let p = &self.progress;
        if p.start > p.cap || p.cap >= 100 {
            return Err(ConfigError::Validation(
                "progress values must satisfy start <= cap < 100".into(),
            ));
        }
        if p.max_step == 0 {
            return Err(ConfigError::Validation(
                "progress.max_step must be non-zero".into(),
            ));
        }
        if p.tick_ms == 0 {
            return Err(ConfigError::Validation(
                "progress.tick_ms must be non-zero".into(),
            ));
        }
        if !(1..=10).contains(&self.encoding.avif_speed) {
            return Err(ConfigError::Validation(
                "encoding.avif_speed must be 1-10".into(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn default_quality(&self) -> QualityPercent {
        QualityPercent::new(self.default_quality)
    }
}

/// Simulated progress settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressConfig {
    pub start: u8,
    pub cap: u8,
    pub max_step: u8,
    pub tick_ms: u64,
    pub reset_delay_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            start: 10,
            cap: 90,
            max_step: 15,
            tick_ms: 200,
            reset_delay_ms: 500,
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }
}

/// Resampling filter names accepted in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// rav1e speed preset used for AVIF output.
    pub avif_speed: u8,
    /// Filter used when stretching the source onto the surface.
    pub resize_filter: ResizeFilter,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            avif_speed: 6,
            resize_filter: ResizeFilter::Lanczos3,
        }
    }
}

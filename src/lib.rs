//! # Compresso
//!
//! An in-process image re-encoding pipeline. Hand it the bytes of a JPEG,
//! PNG, WEBP or AVIF file, pick an output format and quality, and it produces
//! a downscaled, re-encoded copy that is usually much smaller. Nothing leaves
//! the process: there is no server, no disk state, and no configuration file
//! lookup.
//!
//! # Architecture: Probe, Render, Encode
//!
//! Each job runs the same three steps on tokio's blocking pool:
//!
//! ```text
//! 1. Probe    bytes            →  Dimensions   (header first, full decode as fallback)
//! 2. Render   decoded pixels   →  Surface      (capped size, stretch-to-fit)
//! 3. Encode   Surface          →  payload      (direct, then data-URL round trip)
//! ```
//!
//! The steps live behind the [`imaging::ImageBackend`] trait so the controller
//! can be tested against a recording mock without any pixel work.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Job controller: state machine, job tokens, debounce, progress, handle lifecycle |
//! | [`imaging`] | Pure-Rust image operations: probe, target size, render, encode |
//! | [`config`] | `PipelineConfig` defaults, TOML parsing, and validation |
//! | [`types`] | Shared value types (`SourceKind`, `OutputFormat`, `QualityPercent`, `PipelineStatus`) |
//! | [`naming`] | Download file name derivation (`<base>-compressed.<ext>`) |
//!
//! # Design Decisions
//!
//! ## Last Request Wins
//!
//! Users drag quality sliders. Every settings change restarts a short
//! debounce window, and only when it elapses does a job start. Jobs are never
//! aborted mid-encode; instead each carries a [`pipeline::job::JobToken`] and
//! its outcome is applied only if no newer job (or selection, or reset) has
//! happened since. An old, slow job therefore can never overwrite a newer,
//! faster one.
//!
//! ## One Owned Context
//!
//! All mutable state sits in a single [`Pipeline`] value. There are no
//! globals, so several pipelines can coexist and tests construct their own.
//! Background work reports back over a channel and is folded in by
//! [`Pipeline::next_event`], which keeps every state change on the caller's
//! task.
//!
//! ## Handles Are Released Exactly Once
//!
//! Displayed payloads (the source preview and the current result) are
//! registered as [`pipeline::handles::ObjectHandle`]s. Handles are not
//! `Clone` and releasing one consumes it, so a double release does not
//! compile and a leak shows up in [`Pipeline::live_handles`].
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and encoding use the `image` crate, `rav1d` for AVIF decode and
//! `rav1e` (through `image`) for AVIF encode. No system libraries are needed.
//!
//! # Example
//!
//! ```no_run
//! use compresso::{OutputFormat, Pipeline, PipelineConfig, RustBackend};
//!
//! # async fn run(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = Pipeline::new(RustBackend::new(), PipelineConfig::default())?;
//! pipeline.select_source("holiday.png", "image/png", bytes).await?;
//! pipeline.set_format(OutputFormat::Avif);
//! pipeline.settle().await;
//!
//! if let Some(download) = pipeline.download() {
//!     println!("{}: {} bytes", download.file_name, download.bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod imaging;
pub mod naming;
pub mod pipeline;
pub mod types;

pub use config::{ConfigError, PipelineConfig};
pub use imaging::{BackendError, Dimensions, ImageBackend, RustBackend};
pub use pipeline::{
    CompressionResult, CompressionStats, Download, Pipeline, PipelineError, PipelineEvent,
    SourceImage,
};
pub use types::{OutputFormat, OutputSpec, PipelineStatus, QualityPercent, QualityPreset, SourceKind};

#[cfg(test)]
pub(crate) mod test_helpers;

//! The compression pipeline controller.
//!
//! [`Pipeline`] owns everything with a lifecycle: the selected source, the
//! current result, the handles both are displayed through, the settings, and
//! the job bookkeeping. It is a plain owned value driven from one task:
//!
//! ```text
//! select_source ──► ready ──(debounce)──► compressing ──► done | error
//!        ▲            ▲ settings change          │
//!        └────────────┴──────────────────────────┘   reset ──► idle
//! ```
//!
//! Mutating calls (`select_source`, `set_quality`, `set_format`, `reset`)
//! return immediately after updating state. Work that completes later (the
//! debounce timer, a finished job, progress ticks) is delivered through
//! [`Pipeline::next_event`], which the embedder polls in its event loop.
//!
//! ## Stale results
//!
//! Every job carries a [`JobToken`]. A finished job is applied only if its
//! token is still the latest issued; selecting a new source or resetting
//! invalidates all outstanding tokens. The check and the state update happen
//! inside one synchronous `&mut self` call, so nothing can interleave between
//! them.

pub mod handles;
pub mod job;
pub mod progress;

use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::config::{ConfigError, PipelineConfig};
use crate::imaging::{
    BackendError, CompressRequest, Dimensions, EncodedImage, ImageBackend, probe_dimensions,
};
use crate::naming::compressed_file_name;
use crate::types::{OutputFormat, OutputSpec, PipelineStatus, QualityPercent, QualityPreset, SourceKind};
use handles::{HandleRegistry, ObjectHandle};
use job::{Debouncer, JobMessage, JobToken, JobTokens, spawn_job};
use progress::{COMPLETE, ProgressTicker};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file type '{0}': choose a JPEG, PNG, WEBP or AVIF image")]
    UnsupportedInput(String),
    #[error("Could not decode the image: {0}")]
    Decode(String),
    #[error("Compression failed: {0}")]
    Encode(String),
    #[error("Rendering surface unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("No source image selected")]
    NoSource,
}

impl From<BackendError> for PipelineError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Decode(msg) => Self::Decode(msg),
            BackendError::Render(msg) => Self::SurfaceUnavailable(msg),
            BackendError::Encode(msg) | BackendError::Unsupported(msg) => Self::Encode(msg),
        }
    }
}

/// Something that happened outside a direct call.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The debounce window elapsed and a job was spawned.
    JobStarted { token: JobToken },
    /// Simulated progress moved. A value of 0 after completion marks the
    /// display reset.
    Progress { token: JobToken, value: u8 },
    /// The latest job succeeded and its result is now visible.
    Completed {
        token: JobToken,
        width: u32,
        height: u32,
        size_bytes: usize,
    },
    /// The latest job failed; any previous result stays visible.
    Failed { token: JobToken, message: String },
    /// A superseded job finished and its outcome was dropped.
    Discarded { token: JobToken },
}

/// The selected input image. Immutable once created.
#[derive(Debug)]
pub struct SourceImage {
    pub file_name: String,
    pub kind: SourceKind,
    pub bytes: Bytes,
    /// Probed size; `{0, 0}` when the probe failed.
    pub dimensions: Dimensions,
    preview: ObjectHandle,
}

impl SourceImage {
    pub fn mime(&self) -> &'static str {
        self.kind.mime()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn preview_url(&self) -> String {
        self.preview.url()
    }
}

/// Output of the most recent applied job.
#[derive(Debug)]
pub struct CompressionResult {
    pub payload: Bytes,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub token: JobToken,
    preview: ObjectHandle,
}

impl CompressionResult {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }

    pub fn preview_url(&self) -> String {
        self.preview.url()
    }
}

/// A result packaged for saving.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Bytes,
}

/// Size comparison between the source and the current result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionStats {
    pub original_bytes: usize,
    pub compressed_bytes: usize,
    /// Percentage saved; negative when the output is larger.
    pub saved_percent: f64,
}

enum Wake {
    Message(JobMessage),
    Debounce,
    ProgressReset,
    Closed,
}

/// Single-owner compression pipeline.
pub struct Pipeline<B: ImageBackend + 'static> {
    backend: Arc<B>,
    config: PipelineConfig,
    status: PipelineStatus,
    spec: OutputSpec,
    source: Option<SourceImage>,
    result: Option<CompressionResult>,
    error_message: Option<String>,
    progress: u8,
    handles: HandleRegistry,
    tokens: JobTokens,
    debouncer: Debouncer,
    ticker: Option<ProgressTicker>,
    progress_reset: Option<(Instant, JobToken)>,
    outstanding_jobs: usize,
    tx: UnboundedSender<JobMessage>,
    rx: UnboundedReceiver<JobMessage>,
}

impl<B: ImageBackend + 'static> Pipeline<B> {
    /// Create an idle pipeline. The config is validated first.
    pub fn new(backend: B, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            backend: Arc::new(backend),
            status: PipelineStatus::Idle,
            spec: Self::default_spec(&config),
            source: None,
            result: None,
            error_message: None,
            progress: 0,
            handles: HandleRegistry::new(),
            tokens: JobTokens::new(),
            debouncer: Debouncer::new(config.debounce()),
            ticker: None,
            progress_reset: None,
            outstanding_jobs: 0,
            config,
            tx,
            rx,
        })
    }

    fn default_spec(config: &PipelineConfig) -> OutputSpec {
        OutputSpec {
            format: OutputFormat::default(),
            quality: config.default_quality(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn output_spec(&self) -> OutputSpec {
        self.spec
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn result(&self) -> Option<&CompressionResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Number of handles currently registered: one per displayed resource.
    pub fn live_handles(&self) -> usize {
        self.handles.live_count()
    }

    /// Load a new source image.
    ///
    /// Accepted from any state. Any in-flight job is superseded, the previous
    /// source and result are released, and a job is scheduled after the
    /// debounce window. Unsupported types leave the pipeline untouched apart
    /// from the error message.
    pub async fn select_source(
        &mut self,
        file_name: &str,
        mime: &str,
        bytes: impl Into<Bytes>,
    ) -> Result<Dimensions, PipelineError> {
        let Some(kind) = SourceKind::from_mime(mime) else {
            let err = PipelineError::UnsupportedInput(mime.trim().to_string());
            log::warn!("rejected {}: {}", file_name, err);
            self.error_message = Some(err.to_string());
            return Err(err);
        };

        let bytes: Bytes = bytes.into();
        let backend = Arc::clone(&self.backend);
        let probe_bytes = bytes.clone();
        let probe = tokio::task::spawn_blocking(move || {
            probe_dimensions(backend.as_ref(), &probe_bytes, kind)
        });
        let dimensions = match probe.await {
            Ok(dims) => dims,
            Err(err) => {
                log::warn!("dimension probe for {} did not finish: {}", file_name, err);
                Dimensions::ZERO
            }
        };

        self.supersede();
        self.release_all();

        let preview = self.handles.create(bytes.clone(), kind.mime());
        log::info!(
            "selected {} ({}, {} bytes, {}x{})",
            file_name,
            kind.mime(),
            bytes.len(),
            dimensions.width,
            dimensions.height
        );
        self.source = Some(SourceImage {
            file_name: file_name.to_string(),
            kind,
            bytes,
            dimensions,
            preview,
        });
        self.spec.format = OutputFormat::default_for(kind);
        self.status = PipelineStatus::Ready;
        self.error_message = None;
        self.progress = 0;
        self.debouncer.trigger();
        Ok(dimensions)
    }

    /// Change the quality percent (clamped to 10-100).
    pub fn set_quality(&mut self, percent: u8) {
        self.spec.quality = QualityPercent::new(percent);
        self.settings_changed();
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.spec.format = format;
        self.settings_changed();
    }

    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.set_quality(preset.quality().value());
    }

    fn settings_changed(&mut self) {
        if self.status.is_armed() {
            self.debouncer.trigger();
        }
    }

    /// Start a job immediately instead of waiting for the debounce window.
    pub fn compress_now(&mut self) -> Result<JobToken, PipelineError> {
        self.debouncer.cancel();
        self.start_job()
    }

    /// Return to `idle`: release every handle, restore default settings, and
    /// supersede any in-flight job.
    pub fn reset(&mut self) {
        self.supersede();
        self.release_all();
        self.spec = Self::default_spec(&self.config);
        self.status = PipelineStatus::Idle;
        self.error_message = None;
        self.progress = 0;
        log::info!("pipeline reset");
    }

    /// The current result, named after the source. Read through the result's
    /// handle, so a released result can never be offered.
    pub fn download(&self) -> Option<Download> {
        let source = self.source.as_ref()?;
        let result = self.result.as_ref()?;
        let bytes = self.handles.resolve(&result.preview)?.clone();
        Some(Download {
            file_name: compressed_file_name(&source.file_name, result.format),
            mime: result.mime(),
            bytes,
        })
    }

    pub fn stats(&self) -> Option<CompressionStats> {
        let original = self.source.as_ref()?.size_bytes();
        let compressed = self.result.as_ref()?.size_bytes();
        let saved_percent = if original == 0 {
            0.0
        } else {
            (1.0 - compressed as f64 / original as f64) * 100.0
        };
        Some(CompressionStats {
            original_bytes: original,
            compressed_bytes: compressed,
            saved_percent,
        })
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once nothing is pending: no debounce scheduled, no job
    /// outstanding, and no progress display reset due.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        loop {
            let wake = match self.rx.try_recv() {
                Ok(message) => Wake::Message(message),
                Err(_) if self.is_quiescent() => return None,
                Err(_) => self.wait().await,
            };
            if let Some(event) = self.handle(wake) {
                return Some(event);
            }
        }
    }

    /// Drive the pipeline until nothing is pending. Returns every event seen.
    pub async fn settle(&mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn is_quiescent(&self) -> bool {
        self.outstanding_jobs == 0 && !self.debouncer.is_pending() && self.progress_reset.is_none()
    }

    async fn wait(&mut self) -> Wake {
        let debounce = self.debouncer.deadline();
        let reset = self.progress_reset.map(|(at, _)| at);
        tokio::select! {
            biased;
            message = self.rx.recv() => message.map_or(Wake::Closed, Wake::Message),
            _ = sleep_until(debounce) => Wake::Debounce,
            _ = sleep_until(reset) => Wake::ProgressReset,
        }
    }

    fn handle(&mut self, wake: Wake) -> Option<PipelineEvent> {
        match wake {
            Wake::Message(JobMessage::Progress { token, value }) => {
                let live = self.ticker.as_ref().is_some_and(|t| t.token() == token);
                if !live || self.status != PipelineStatus::Compressing {
                    return None;
                }
                self.progress = value;
                Some(PipelineEvent::Progress { token, value })
            }
            Wake::Message(JobMessage::Finished { token, outcome }) => {
                self.outstanding_jobs = self.outstanding_jobs.saturating_sub(1);
                Some(self.apply(token, outcome))
            }
            Wake::Debounce => {
                self.debouncer.cancel();
                match self.start_job() {
                    Ok(token) => Some(PipelineEvent::JobStarted { token }),
                    Err(err) => {
                        log::debug!("debounce elapsed without a job: {}", err);
                        None
                    }
                }
            }
            Wake::ProgressReset => {
                let (_, token) = self.progress_reset.take()?;
                self.progress = 0;
                Some(PipelineEvent::Progress { token, value: 0 })
            }
            Wake::Closed => None,
        }
    }

    fn start_job(&mut self) -> Result<JobToken, PipelineError> {
        let source = self.source.as_ref().ok_or(PipelineError::NoSource)?;
        let bytes = source.bytes.clone();
        let request = CompressRequest {
            kind: source.kind,
            spec: self.spec,
            max_dimension: self.config.max_dimension,
            filter: self.config.encoding.resize_filter.into(),
            avif_speed: self.config.encoding.avif_speed,
        };

        let token = self.tokens.issue();
        log::info!(
            "job {} started: {} at quality {}",
            token.get(),
            request.spec.format.mime(),
            request.spec.quality.value()
        );
        spawn_job(token, Arc::clone(&self.backend), bytes, request, self.tx.clone());
        self.outstanding_jobs += 1;
        self.ticker = Some(ProgressTicker::start(
            token,
            &self.config.progress,
            self.tx.clone(),
        ));
        self.progress = self.config.progress.start;
        self.progress_reset = None;
        self.status = PipelineStatus::Compressing;
        Ok(token)
    }

    /// Apply a finished job if it is still the latest. Never suspends.
    fn apply(&mut self, token: JobToken, outcome: Result<EncodedImage, BackendError>) -> PipelineEvent {
        if !self.tokens.is_current(token) {
            match &outcome {
                Ok(_) => log::debug!("job {} superseded, result dropped", token.get()),
                Err(err) => log::debug!("job {} superseded, error dropped: {}", token.get(), err),
            }
            return PipelineEvent::Discarded { token };
        }

        self.stop_ticker();
        self.progress = COMPLETE;
        self.progress_reset = Some((Instant::now() + self.config.progress.reset_delay(), token));

        match outcome {
            Ok(encoded) => {
                let payload = Bytes::from(encoded.payload);
                let preview = self.handles.create(payload.clone(), encoded.format.mime());
                let previous = self.result.replace(CompressionResult {
                    payload,
                    format: encoded.format,
                    width: encoded.width,
                    height: encoded.height,
                    token,
                    preview,
                });
                if let Some(previous) = previous {
                    self.handles.release(previous.preview);
                }
                let size_bytes = self.result.as_ref().map_or(0, |r| r.size_bytes());
                log::info!(
                    "job {} done: {}x{}, {} bytes",
                    token.get(),
                    encoded.width,
                    encoded.height,
                    size_bytes
                );
                self.status = PipelineStatus::Done;
                self.error_message = None;
                PipelineEvent::Completed {
                    token,
                    width: encoded.width,
                    height: encoded.height,
                    size_bytes,
                }
            }
            Err(err) => {
                let message = PipelineError::from(err).to_string();
                log::warn!("job {} failed: {}", token.get(), message);
                self.status = PipelineStatus::Error;
                self.error_message = Some(message.clone());
                PipelineEvent::Failed { token, message }
            }
        }
    }

    /// Make every outstanding job stale and stop its timers.
    fn supersede(&mut self) {
        self.tokens.invalidate();
        self.debouncer.cancel();
        self.stop_ticker();
        self.progress_reset = None;
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    fn release_all(&mut self) {
        if let Some(result) = self.result.take() {
            self.handles.release(result.preview);
        }
        if let Some(source) = self.source.take() {
            self.handles.release(source.preview);
        }
    }
}

impl<B: ImageBackend + 'static> Drop for Pipeline<B> {
    fn drop(&mut self) {
        self.stop_ticker();
        self.release_all();
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

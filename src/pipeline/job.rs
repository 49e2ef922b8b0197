//! Job sequencing: generation tokens, the settings debouncer, and the
//! background compression task.
//!
//! Jobs are never cancelled. Each one captures the token it was issued under
//! and reports back with it; the controller compares that token against
//! [`JobTokens::is_current`] before touching visible state.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use crate::imaging::{BackendError, CompressRequest, EncodedImage, ImageBackend, compress};

/// Generation stamp of one job. Later tokens compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobToken(u64);

impl JobToken {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Issues job tokens and remembers the latest one.
#[derive(Debug, Default)]
pub struct JobTokens {
    latest: u64,
}

impl JobTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> JobToken {
        self.latest += 1;
        JobToken(self.latest)
    }

    /// Supersede every token issued so far without starting a job.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn is_current(&self, token: JobToken) -> bool {
        token.0 == self.latest
    }
}

/// Trailing-edge debounce: each trigger pushes the deadline out again.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn trigger(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// Message sent from background tasks to the controller.
#[derive(Debug)]
pub enum JobMessage {
    Progress {
        token: JobToken,
        value: u8,
    },
    Finished {
        token: JobToken,
        outcome: Result<EncodedImage, BackendError>,
    },
}

/// Run one compression on the blocking pool and report the outcome.
///
/// Exactly one [`JobMessage::Finished`] is sent per call, unless the
/// controller is gone by then.
pub fn spawn_job<B>(
    token: JobToken,
    backend: Arc<B>,
    bytes: Bytes,
    request: CompressRequest,
    tx: UnboundedSender<JobMessage>,
) where
    B: ImageBackend + 'static,
{
    tokio::spawn(async move {
        let work = tokio::task::spawn_blocking(move || compress(backend.as_ref(), &bytes, &request));
        let outcome = match work.await {
            Ok(outcome) => outcome,
            Err(err) => Err(BackendError::Encode(format!("compression task failed: {}", err))),
        };
        if tx.send(JobMessage::Finished { token, outcome }).is_err() {
            log::debug!("job {} finished after the pipeline was dropped", token.get());
        }
    });
}

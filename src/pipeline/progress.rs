//! Simulated progress while a job is in flight.
//!
//! The value is cosmetic: encoders report nothing, so progress climbs by a
//! random step per tick and stalls at the cap until the job finishes. The
//! ticker is owned by the job through [`ProgressTicker`]; dropping the guard
//! aborts the task, so no tick can outlive its job.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

use super::job::{JobMessage, JobToken};
use crate::config::ProgressConfig;

/// Value shown once a job has finished, before the display reset.
pub const COMPLETE: u8 = 100;

/// Bounded random-walk progress value.
pub struct ProgressEstimator<R> {
    value: u8,
    cap: u8,
    max_step: u8,
    rng: R,
}

impl<R: Rng> ProgressEstimator<R> {
    pub fn new(config: &ProgressConfig, rng: R) -> Self {
        Self {
            value: config.start.min(config.cap),
            cap: config.cap,
            max_step: config.max_step.max(1),
            rng,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn is_capped(&self) -> bool {
        self.value >= self.cap
    }

    /// Advance by a random step in `1..=max_step`, never past the cap.
    pub fn advance(&mut self) -> u8 {
        let step = self.rng.gen_range(1..=self.max_step);
        self.value = self.value.saturating_add(step).min(self.cap);
        self.value
    }
}

/// Running ticker task for one job. Aborted on drop.
pub struct ProgressTicker {
    token: JobToken,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the ticker. Each tick is sent as [`JobMessage::Progress`] tagged
    /// with `token`; the task ends by itself once the cap is reached.
    pub fn start(token: JobToken, config: &ProgressConfig, tx: UnboundedSender<JobMessage>) -> Self {
        let mut estimator = ProgressEstimator::new(config, StdRng::from_entropy());
        let period = config.tick();
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            while !estimator.is_capped() {
                ticks.tick().await;
                let value = estimator.advance();
                if tx.send(JobMessage::Progress { token, value }).is_err() {
                    break;
                }
            }
        });
        Self { token, handle }
    }

    pub fn token(&self) -> JobToken {
        self.token
    }

    /// Stop ticking now. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn config() -> ProgressConfig {
        ProgressConfig::default()
    }

    #[test]
    fn starts_at_configured_value() {
        let estimator = ProgressEstimator::new(&config(), StdRng::seed_from_u64(1));
        assert_eq!(estimator.value(), 10);
        assert!(!estimator.is_capped());
    }

    #[test]
    fn climbs_monotonically_and_stops_at_cap() {
        let mut estimator = ProgressEstimator::new(&config(), StdRng::seed_from_u64(7));
        let mut last = estimator.value();
        for _ in 0..200 {
            let next = estimator.advance();
            assert!(next >= last);
            assert!(next - last <= 15);
            assert!(next <= 90);
            last = next;
        }
        assert_eq!(last, 90);
        assert!(estimator.is_capped());
    }

    #[test]
    fn every_step_moves_forward_below_cap() {
        let mut estimator = ProgressEstimator::new(&config(), StdRng::seed_from_u64(3));
        let before = estimator.value();
        assert!(estimator.advance() > before);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_emits_tagged_ticks_until_cap() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let token = JobToken::from_raw(4);
        let ticker = ProgressTicker::start(token, &config(), tx);
        assert_eq!(ticker.token(), token);

        let mut values = Vec::new();
        while let Some(message) = rx.recv().await {
            match message {
                JobMessage::Progress { token: t, value } => {
                    assert_eq!(t, token);
                    values.push(value);
                }
                other => panic!("unexpected message {other:?}"),
            }
        }
        // Channel closes when the task exits at the cap.
        assert_eq!(values.last(), Some(&90));
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_ticker_sends_nothing_more() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = ProgressTicker::start(JobToken::from_raw(1), &config(), tx);
        ticker.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        // The aborted task dropped its sender without sending.
        assert!(rx.recv().await.is_none());
    }
}

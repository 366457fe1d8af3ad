//! Poll an asynchronous remote operation until it finishes or time runs out.
//!
//! The vendor API exposes no completion events, so waiting is a blocking poll
//! loop with configurable backoff. The overall deadline is checked around every
//! probe and sleeps never run past it.

use crate::error::AdapterError;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Observation returned by one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Still running
    Pending,
    /// Finished successfully
    Done,
    /// Finished with a remote failure
    Failed { message: String },
}

/// How the delay between probes grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Backoff {
    /// Same delay every time
    Fixed,
    /// Add `step` after every probe
    Linear { step: Duration },
    /// Multiply by `factor` after every probe
    Exponential { factor: f64 },
}

/// Polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay after the first probe
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            backoff: Backoff::Exponential { factor: 2.0 },
        }
    }
}

impl PollConfig {
    /// Constant delay between probes.
    pub fn flat(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Calculate the delay after a given probe (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64();
        let delay = match self.backoff {
            Backoff::Fixed => base,
            Backoff::Linear { step } => base + step.as_secs_f64() * f64::from(attempt),
            Backoff::Exponential { factor } => base * factor.powi(attempt as i32),
        };
        let capped = delay.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Why a wait did not end in success.
#[derive(Debug, Error)]
pub enum WaitError {
    /// The deadline passed before the operation finished
    #[error("timed out after {:.1}s", .elapsed.as_secs_f64())]
    TimedOut { elapsed: Duration },

    /// The remote operation reported failure
    #[error("operation failed: {message}")]
    Failed { message: String },

    /// A probe itself failed
    #[error("status probe failed: {0}")]
    Probe(#[from] AdapterError),
}

/// Callback for poll progress notifications.
pub trait WaitCallback {
    /// Called after every probe that left the operation pending.
    ///
    /// # Arguments
    /// * `subject` - What is being waited on
    /// * `attempt` - Probe number (1-indexed)
    /// * `elapsed` - Time since the wait started
    /// * `next_delay` - Sleep before the next probe
    fn on_poll(&self, subject: &str, attempt: u32, elapsed: Duration, next_delay: Duration);
}

/// No-op callback.
pub struct NoCallback;

impl WaitCallback for NoCallback {
    fn on_poll(&self, _subject: &str, _attempt: u32, _elapsed: Duration, _next_delay: Duration) {}
}

/// Callback that writes a debug log line per probe.
pub struct LogCallback;

impl WaitCallback for LogCallback {
    fn on_poll(&self, subject: &str, attempt: u32, elapsed: Duration, next_delay: Duration) {
        log::debug!(
            "{subject}: still pending after probe {attempt} ({:.1}s elapsed), next probe in {:.1}s",
            elapsed.as_secs_f64(),
            next_delay.as_secs_f64()
        );
    }
}

/// Blocks until a remote operation reaches a terminal state.
pub struct OperationTracker<'a> {
    config: PollConfig,
    callback: &'a dyn WaitCallback,
}

impl<'a> OperationTracker<'a> {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            callback: &LogCallback,
        }
    }

    pub fn with_callback(config: PollConfig, callback: &'a dyn WaitCallback) -> Self {
        Self { config, callback }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Probe until `Done`, `Failed`, a probe error, or `timeout` elapses.
    pub fn wait<F>(&self, subject: &str, timeout: Duration, mut probe: F) -> Result<(), WaitError>
    where
        F: FnMut() -> Result<Probe, AdapterError>,
    {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut attempt: u32 = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(WaitError::TimedOut {
                    elapsed: start.elapsed(),
                });
            }

            match probe()? {
                Probe::Done => {
                    log::debug!(
                        "{subject}: done after {:.1}s",
                        start.elapsed().as_secs_f64()
                    );
                    return Ok(());
                }
                Probe::Failed { message } => return Err(WaitError::Failed { message }),
                Probe::Pending => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::TimedOut {
                    elapsed: start.elapsed(),
                });
            }

            let delay = self
                .config
                .delay_for_attempt(attempt)
                .min(deadline - now);
            attempt += 1;
            self.callback
                .on_poll(subject, attempt, start.elapsed(), delay);
            thread::sleep(delay);
        }
    }
}

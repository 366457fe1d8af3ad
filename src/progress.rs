//! Progress indicators for the CLI.

use converge::WaitCallback;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a ticking spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Shows polling progress on a spinner while the engine waits
pub struct SpinnerCallback {
    pb: ProgressBar,
}

impl SpinnerCallback {
    pub fn new(msg: &str) -> Self {
        Self { pb: spinner(msg) }
    }

    /// A callback whose spinner never draws
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl WaitCallback for SpinnerCallback {
    fn on_poll(&self, subject: &str, attempt: u32, _elapsed: Duration, next_delay: Duration) {
        log::debug!("{subject}: probe {attempt} pending");
        self.pb.set_message(format!(
            "Waiting for {subject} (poll {attempt}, next in {:.0}s)",
            next_delay.as_secs_f64()
        ));
    }
}

impl Drop for SpinnerCallback {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

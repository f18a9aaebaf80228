//! Bounded polling.
//!
//! The daemon never pushes notifications. Anything that wants to know
//! whether the authenticator came up (or went away) polls a point-in-time
//! predicate inside a fixed window.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Polling window: how long to keep trying and how often.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Total time budget.
    pub timeout: Duration,
    /// Delay between evaluations.
    pub interval: Duration,
}

impl PollConfig {
    /// Creates a polling window.
    #[must_use]
    pub const fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_millis(50))
    }
}

/// Polls an async predicate until it returns true or the window closes.
///
/// The predicate is evaluated immediately, then once per interval, and one
/// last time at the deadline so a condition that turns true during the
/// final sleep is not missed.
pub async fn wait_for<F, Fut>(poll: PollConfig, mut predicate: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + poll.timeout;
    loop {
        if predicate().await {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        let remaining = deadline - now;
        tokio::time::sleep(poll.interval.min(remaining)).await;
    }
}

/// Synchronous-predicate variant of [`wait_for`].
pub async fn wait_for_sync<F>(poll: PollConfig, mut predicate: F) -> bool
where
    F: FnMut() -> bool,
{
    wait_for(poll, || std::future::ready(predicate())).await
}

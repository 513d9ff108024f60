//! Absolute deadlines threaded through every blocking call

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// An absolute point in time after which any wait must give up.
///
/// A deadline is fixed when a workflow starts and handed down unchanged.
/// Sub-budgets (lock timeouts) are derived from it and are never larger
/// than the time that is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Remaining time minus `headroom`, or `None` if the headroom does not fit.
    ///
    /// Used to reserve time for a known-slow step that has to happen after
    /// the budgeted one (booting a machine after its submission, for example).
    pub fn budget_after(&self, headroom: Duration) -> Option<Duration> {
        let now = Instant::now();
        if now >= self.at {
            return None;
        }
        (self.at - now).checked_sub(headroom)
    }

    /// Sleep for `interval`, cut short so the deadline is not overslept.
    pub async fn sleep(&self, interval: Duration) {
        let wake = (Instant::now() + interval).min(self.at);
        tokio::time::sleep_until(wake).await;
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms left", self.remaining().as_millis())
    }
}

//! Polling cadence and the shared resource-state wait loop

use crate::deadline::Deadline;
use crate::error::CloudError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Polling and retry settings shared by every wait in a provider engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Sleep between two polls, and between two retries of a request
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,

    /// Attempts for a read request that keeps failing at the connection level
    pub get_attempts: u32,

    /// Time reserved after submission for a virtual machine to boot
    #[serde(rename = "boot_headroom_ms", with = "millis")]
    pub boot_headroom: Duration,

    /// Per-request HTTP timeout
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            get_attempts: 5,
            boot_headroom: Duration::from_secs(5 * 60),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of inspecting one observation of a resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// The awaited state was reached
    Ready(T),
    /// Not there yet; carries the observed state for the timeout message
    Pending(String),
    /// The resource is in a state it cannot leave towards the awaited one
    Fatal(String),
}

/// Poll `fetch` until `check` reports the resource ready.
///
/// `Fatal` fails at once with [`CloudError::InvalidState`]. Once the
/// deadline has passed a `Pending` observation fails with
/// [`CloudError::Timeout`] naming the last state seen.
pub async fn await_state<S, T, E, F, Fut, C>(
    deadline: Deadline,
    interval: Duration,
    what: &str,
    mut fetch: F,
    mut check: C,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<S, E>>,
    C: FnMut(S) -> PollStep<T>,
    E: From<CloudError>,
{
    let mut polls: u32 = 0;
    loop {
        let observed = fetch().await?;
        polls += 1;
        match check(observed) {
            PollStep::Ready(value) => {
                tracing::debug!("{} reached after {} poll(s)", what, polls);
                return Ok(value);
            }
            PollStep::Fatal(reason) => {
                return Err(CloudError::InvalidState(format!("{}: {}", what, reason)).into());
            }
            PollStep::Pending(state) => {
                if deadline.is_expired() {
                    return Err(CloudError::Timeout(format!(
                        "Timed out waiting for {}. Last state was: {}",
                        what, state
                    ))
                    .into());
                }
                tracing::debug!("Waiting for {} (current state: {})", what, state);
                deadline.sleep(interval).await;
            }
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

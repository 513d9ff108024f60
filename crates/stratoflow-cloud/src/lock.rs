//! Serialization locks for provider resources that are not safely
//! concurrently mutable

use crate::error::{CloudError, Result};
use std::fmt;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Resource domain guarded by one lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockDomain {
    /// Cloud service / deployment / role submissions
    General,
    /// Read-modify-write of the network topology document
    Network,
    /// Data-disk attach and detach sequences
    Storage,
}

impl fmt::Display for LockDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDomain::General => write!(f, "general"),
            LockDomain::Network => write!(f, "network"),
            LockDomain::Storage => write!(f, "storage"),
        }
    }
}

/// The three mutation gates of a provider client.
///
/// Built on `tokio::sync::Mutex`, which hands the lock to waiters in arrival
/// order, so a busy domain cannot starve a caller.
#[derive(Debug, Default)]
pub struct SerializationLocks {
    general: Mutex<()>,
    network: Mutex<()>,
    storage: Mutex<()>,
}

impl SerializationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, domain: LockDomain) -> &Mutex<()> {
        match domain {
            LockDomain::General => &self.general,
            LockDomain::Network => &self.network,
            LockDomain::Storage => &self.storage,
        }
    }

    /// Wait at most `timeout` for the lock of `domain`.
    pub async fn acquire(&self, domain: LockDomain, timeout: Duration) -> Result<LockGuard<'_>> {
        tracing::debug!("Waiting for {} lock ({}ms budget)", domain, timeout.as_millis());
        match tokio::time::timeout(timeout, self.mutex(domain).lock()).await {
            Ok(guard) => {
                tracing::debug!("Acquired {} lock", domain);
                Ok(LockGuard {
                    domain,
                    _guard: guard,
                })
            }
            Err(_) => Err(CloudError::LockTimeout(format!(
                "Failed to acquire {} lock after {} milliseconds",
                domain,
                timeout.as_millis()
            ))),
        }
    }

    /// Non-blocking check, mostly useful for diagnostics.
    pub fn is_locked(&self, domain: LockDomain) -> bool {
        self.mutex(domain).try_lock().is_err()
    }
}

/// RAII guard for a serialization lock; the lock is released when dropped
#[derive(Debug)]
pub struct LockGuard<'a> {
    domain: LockDomain,
    _guard: MutexGuard<'a, ()>,
}

impl LockGuard<'_> {
    pub fn domain(&self) -> LockDomain {
        self.domain
    }

    /// Release the lock explicitly
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        tracing::debug!("Released {} lock", self.domain);
    }
}

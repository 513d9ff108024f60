//! Cloud orchestration error types

use thiserror::Error;

/// Errors shared by every provider engine built on this crate.
///
/// Absence of a resource is not an error here: existence checks return
/// `Option`/`bool` and lifecycle operations turn absence into a no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// The provider rejected a request with a non-retryable error.
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// An accepted asynchronous operation reached the `Failed` state.
    #[error("Operation failed {code}: {message}")]
    OperationFailed { code: String, message: String },

    /// A deadline passed while polling or retrying.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A serialization lock could not be acquired in time.
    #[error("Lock acquisition failed: {0}")]
    LockTimeout(String),

    /// A resource was observed in a state the workflow cannot continue from.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
}

impl CloudError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CloudError::Timeout(_))
    }

    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, CloudError::LockTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

//! Azure provider error types

use stratoflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// The request never got a response (refused, reset, timed out).
    #[error("Connection failure: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document codec error: {0}")]
    Codec(String),

    /// The provider answered, but not the way the protocol says it should.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AzureError {
    /// The orchestration-level error, if this is one
    pub fn cloud(&self) -> Option<&CloudError> {
        match self {
            AzureError::Cloud(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.cloud().is_some_and(CloudError::is_timeout)
    }

    pub fn is_lock_timeout(&self) -> bool {
        self.cloud().is_some_and(CloudError::is_lock_timeout)
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;

//! Response classification

use crate::codec::{Codec, decode_document};
use crate::transport::RawResponse;
use serde::{Deserialize, Serialize};
use stratoflow_cloud::CloudError;

/// Error code the provider uses for "another mutation is in flight, try again"
pub const CONFLICT_CODE: &str = "ConflictError";

/// Error document returned with non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

impl ProviderError {
    pub fn is_conflict(&self) -> bool {
        self.code == CONFLICT_CODE
    }

    pub fn is_not_found(&self) -> bool {
        self.code == "ResourceNotFound"
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<ProviderError> for CloudError {
    fn from(e: ProviderError) -> Self {
        CloudError::Api {
            code: e.code,
            message: e.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Success(RawResponse),
    /// Recoverable; retry until the deadline
    Conflict(ProviderError),
    Fatal(ProviderError),
}

pub fn classify(codec: &dyn Codec, response: RawResponse) -> Classified {
    if response.is_success() {
        return Classified::Success(response);
    }

    let error = decode_document::<ProviderError>(codec, &response.body).unwrap_or_else(|e| {
        tracing::debug!("Undecodable error body for HTTP {}: {}", response.status, e);
        ProviderError {
            code: response.status.to_string(),
            message: String::from_utf8_lossy(&response.body).into_owned(),
        }
    });

    if error.is_conflict() {
        Classified::Conflict(error)
    } else {
        Classified::Fatal(error)
    }
}

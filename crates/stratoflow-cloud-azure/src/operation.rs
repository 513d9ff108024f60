//! Asynchronous operation tracking

use crate::classify::ProviderError;
use crate::error::Result;
use crate::rest::RestClient;
use serde::{Deserialize, Serialize};
use stratoflow_cloud::{CloudError, Deadline, PollStep, await_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationState::InProgress => write!(f, "InProgress"),
            OperationState::Succeeded => write!(f, "Succeeded"),
            OperationState::Failed => write!(f, "Failed"),
        }
    }
}

/// Document returned by `GET /operations/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: OperationState,
    #[serde(rename = "HttpStatusCode", default)]
    pub http_status_code: Option<u16>,
    #[serde(rename = "Error", default)]
    pub error: Option<ProviderError>,
}

impl OperationStatus {
    /// Terminal outcome, or `None` while still running
    fn outcome(self) -> Option<std::result::Result<(), CloudError>> {
        match self.status {
            OperationState::InProgress => None,
            OperationState::Succeeded => Some(Ok(())),
            OperationState::Failed => {
                let error = self.error.unwrap_or_else(|| ProviderError {
                    code: self
                        .http_status_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    message: format!("operation {} failed without an error document", self.id),
                });
                Some(Err(CloudError::OperationFailed {
                    code: error.code,
                    message: error.message,
                }))
            }
        }
    }
}

impl RestClient {
    /// Poll an operation until it succeeds, fails, or the deadline passes
    ///
    /// A failed operation is terminal and never retried.
    pub async fn await_operation(&self, request_id: &str, deadline: Deadline) -> Result<()> {
        let path = format!("/operations/{}", request_id);
        let path = path.as_str();
        let what = format!("operation {}", request_id);

        let outcome = await_state(
            deadline,
            self.poll().interval,
            &what,
            move || self.get::<OperationStatus>(path, deadline),
            |status| match status.outcome() {
                Some(outcome) => PollStep::Ready(outcome),
                None => PollStep::Pending(OperationState::InProgress.to_string()),
            },
        )
        .await?;

        if let Err(e) = &outcome {
            tracing::warn!("Operation {} failed: {}", request_id, e);
        }
        Ok(outcome?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(state: OperationState, error: Option<ProviderError>) -> OperationStatus {
        OperationStatus {
            id: "req-1".to_string(),
            status: state,
            http_status_code: Some(400),
            error,
        }
    }

    #[test]
    fn test_in_progress_has_no_outcome() {
        assert!(status(OperationState::InProgress, None).outcome().is_none());
    }

    #[test]
    fn test_failed_carries_provider_error() {
        let outcome = status(
            OperationState::Failed,
            Some(ProviderError {
                code: "BadRequest".to_string(),
                message: "image not found".to_string(),
            }),
        )
        .outcome();

        assert_eq!(
            outcome,
            Some(Err(CloudError::OperationFailed {
                code: "BadRequest".to_string(),
                message: "image not found".to_string(),
            }))
        );
    }

    #[test]
    fn test_failed_without_error_document_uses_status_code() {
        match status(OperationState::Failed, None).outcome() {
            Some(Err(CloudError::OperationFailed { code, .. })) => assert_eq!(code, "400"),
            other => panic!("expected OperationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize() {
        let status: OperationStatus = serde_json::from_str(
            r#"{"ID":"req-9","Status":"Succeeded","HttpStatusCode":200}"#,
        )
        .unwrap();
        assert_eq!(status.status, OperationState::Succeeded);
        assert!(status.error.is_none());
    }
}

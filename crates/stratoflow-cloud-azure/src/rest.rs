//! Deadline-bounded request layer
//!
//! Reads retry connection failures a fixed number of times. Mutations never
//! retry a connection failure (the provider may already have accepted the
//! request) but keep resubmitting while the provider answers with a
//! conflict, until the deadline passes.

use crate::classify::{Classified, classify};
use crate::codec::{Codec, decode_document, encode_document};
use crate::error::{AzureError, Result};
use crate::transport::{HttpMethod, HttpRequest, RawResponse, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use stratoflow_cloud::{CloudError, Deadline, PollConfig};

pub struct RestClient {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    poll: PollConfig,
}

impl RestClient {
    pub fn new(transport: Arc<dyn Transport>, codec: Arc<dyn Codec>, poll: PollConfig) -> Self {
        Self {
            transport,
            codec,
            poll,
        }
    }

    pub fn poll(&self) -> &PollConfig {
        &self.poll
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    async fn get_raw(&self, path: &str, deadline: Deadline) -> Result<RawResponse> {
        let attempts = self.poll.get_attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            match self.transport.send(HttpRequest::get(path)).await {
                Ok(response) => return Ok(response),
                Err(AzureError::Connection(msg)) => {
                    tracing::warn!(
                        "GET {} failed (attempt {}/{}): {}",
                        path,
                        attempt,
                        attempts,
                        msg
                    );
                    last_failure = msg;
                    if deadline.is_expired() {
                        break;
                    }
                    if attempt < attempts {
                        deadline.sleep(self.poll.interval).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(CloudError::Timeout(format!(
            "GET {} did not get a response after {} attempts: {}",
            path, attempts, last_failure
        ))
        .into())
    }

    /// GET and decode a document; any non-2xx answer is an error
    pub async fn get<T: DeserializeOwned>(&self, path: &str, deadline: Deadline) -> Result<T> {
        let response = self.get_raw(path, deadline).await?;
        match classify(self.codec(), response) {
            Classified::Success(response) => decode_document(self.codec(), &response.body),
            Classified::Conflict(e) | Classified::Fatal(e) => Err(CloudError::from(e).into()),
        }
    }

    /// GET and decode a document, mapping "not found" to `None`
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        deadline: Deadline,
    ) -> Result<Option<T>> {
        let response = self.get_raw(path, deadline).await?;
        if response.status == 404 {
            return Ok(None);
        }
        match classify(self.codec(), response) {
            Classified::Success(response) => {
                Ok(Some(decode_document(self.codec(), &response.body)?))
            }
            Classified::Fatal(e) if e.is_not_found() => Ok(None),
            Classified::Conflict(e) | Classified::Fatal(e) => Err(CloudError::from(e).into()),
        }
    }

    /// Submit a mutating request and return its operation id
    pub async fn send_mutation(&self, request: HttpRequest, deadline: Deadline) -> Result<String> {
        loop {
            let response = self.transport.send(request.clone()).await?;
            match classify(self.codec(), response) {
                Classified::Success(response) => {
                    return response.request_id.ok_or_else(|| {
                        AzureError::Protocol(format!(
                            "{} {} was accepted without a request id",
                            request.method, request.path
                        ))
                    });
                }
                Classified::Conflict(e) => {
                    if deadline.is_expired() {
                        return Err(CloudError::Timeout(format!(
                            "{} {} kept conflicting until the deadline. Last error was {} - {}",
                            request.method, request.path, e.code, e.message
                        ))
                        .into());
                    }
                    tracing::debug!(
                        "{} {} conflicted ({}), retrying in {}ms",
                        request.method,
                        request.path,
                        e.message,
                        self.poll.interval.as_millis()
                    );
                    deadline.sleep(self.poll.interval).await;
                }
                Classified::Fatal(e) => return Err(CloudError::from(e).into()),
            }
        }
    }

    pub async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        deadline: Deadline,
    ) -> Result<String> {
        let body = encode_document(self.codec(), body)?;
        let request = HttpRequest::new(HttpMethod::Post, path)
            .with_body(body)
            .with_content_type(self.codec().content_type());
        self.send_mutation(request, deadline).await
    }

    pub async fn put<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        content_type: &'static str,
        deadline: Deadline,
    ) -> Result<String> {
        let body = encode_document(self.codec(), body)?;
        let request = HttpRequest::new(HttpMethod::Put, path)
            .with_body(body)
            .with_content_type(content_type);
        self.send_mutation(request, deadline).await
    }

    pub async fn delete(&self, path: &str, deadline: Deadline) -> Result<String> {
        self.send_mutation(HttpRequest::new(HttpMethod::Delete, path), deadline)
            .await
    }

    /// POST, then wait for the operation to finish
    pub async fn post_and_wait<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        deadline: Deadline,
    ) -> Result<()> {
        let request_id = self.post(path, body, deadline).await?;
        self.await_operation(&request_id, deadline).await
    }

    /// DELETE, then wait for the operation to finish
    pub async fn delete_and_wait(&self, path: &str, deadline: Deadline) -> Result<()> {
        let request_id = self.delete(path, deadline).await?;
        self.await_operation(&request_id, deadline).await
    }
}

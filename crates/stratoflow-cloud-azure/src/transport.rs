//! HTTP transport seam
//!
//! [`Transport`] sends a single request and hands back the raw response. It
//! does no retrying or classification; that lives in
//! [`RestClient`](crate::rest::RestClient). A transport reports "the request
//! never got an answer" as [`AzureError::Connection`], which is the only
//! failure the GET path retries.

use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use async_trait::async_trait;

pub const API_VERSION_HEADER: &str = "x-ms-version";
pub const REQUEST_ID_HEADER: &str = "x-ms-request-id";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request against the subscription
///
/// `path` is relative to the subscription root and may carry a query string,
/// e.g. `/services/hostedservices/web?embed-detail=true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub content_type: &'static str,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            content_type: CONTENT_TYPE_XML,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub request_id: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse>;
}

/// `reqwest` transport authenticating with a client certificate
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
}

impl HttpTransport {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.poll.request_timeout);

        match (&config.certificate_pem, &config.private_key_pem) {
            (Some(cert), Some(key)) => {
                let mut pem = std::fs::read(cert)?;
                pem.push(b'\n');
                pem.extend(std::fs::read(key)?);
                let identity = reqwest::Identity::from_pem(&pem)?;
                builder = builder.identity(identity);
            }
            (Some(cert), None) => {
                // a bundle holding both certificate and key
                let identity = reqwest::Identity::from_pem(&std::fs::read(cert)?)?;
                builder = builder.identity(identity);
            }
            (None, Some(_)) => {
                return Err(AzureError::InvalidConfig(
                    "private_key_pem given without certificate_pem".to_string(),
                ));
            }
            (None, None) => {
                tracing::warn!("No management certificate configured; requests will not be authenticated");
            }
        }

        Ok(Self {
            client: builder.build()?,
            base_url: format!(
                "{}/{}",
                config.endpoint.trim_end_matches('/'),
                config.subscription_id
            ),
            api_version: config.api_version.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse> {
        let url = self.url(&request.path);
        tracing::debug!("{} {}", request.method, url);

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header(API_VERSION_HEADER, &self.api_version)
            .header(reqwest::header::CONTENT_TYPE, request.content_type);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() || e.is_request() {
                AzureError::Connection(format!("{} {}: {}", request.method, request.path, e))
            } else {
                AzureError::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            request_id,
            body,
        })
    }
}

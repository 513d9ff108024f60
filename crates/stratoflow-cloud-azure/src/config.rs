//! Client configuration

use crate::error::{AzureError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratoflow_cloud::PollConfig;

pub const DEFAULT_ENDPOINT: &str = "https://management.core.windows.net";
pub const DEFAULT_API_VERSION: &str = "2014-06-01";

/// Settings for an [`AzureClient`](crate::AzureClient)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureConfig {
    pub subscription_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// PEM file with the management certificate
    #[serde(default)]
    pub certificate_pem: Option<PathBuf>,

    /// PEM file with the certificate's private key
    #[serde(default)]
    pub private_key_pem: Option<PathBuf>,

    #[serde(default)]
    pub affinity_prefix: String,

    /// Prefix of generated cloud service names
    #[serde(default)]
    pub cloud_service_prefix: String,

    #[serde(default)]
    pub storage_prefix: String,

    /// Virtual network the client's machines live in
    #[serde(default)]
    pub virtual_network: Option<String>,

    #[serde(default)]
    pub poll: PollConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl AzureConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            certificate_pem: None,
            private_key_pem: None,
            affinity_prefix: String::new(),
            cloud_service_prefix: String::new(),
            storage_prefix: String::new(),
            virtual_network: None,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    pub fn with_boot_headroom(mut self, headroom: Duration) -> Self {
        self.poll.boot_headroom = headroom;
        self
    }

    pub fn with_cloud_service_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cloud_service_prefix = prefix.into();
        self
    }

    pub fn with_virtual_network(mut self, network: impl Into<String>) -> Self {
        self.virtual_network = Some(network.into());
        self
    }

    /// Create AzureConfig from environment variables
    ///
    /// `AZURE_SUBSCRIPTION_ID` is required; `AZURE_CERTIFICATE_PEM`,
    /// `AZURE_PRIVATE_KEY_PEM`, `AZURE_MANAGEMENT_ENDPOINT`,
    /// `AZURE_AFFINITY_PREFIX`, `AZURE_CLOUD_SERVICE_PREFIX`,
    /// `AZURE_STORAGE_PREFIX`, `AZURE_VIRTUAL_NETWORK` and
    /// `AZURE_POLL_INTERVAL_MS` are optional.
    pub fn from_env() -> Result<Self> {
        let subscription_id = std::env::var("AZURE_SUBSCRIPTION_ID")
            .map_err(|_| AzureError::MissingEnvVar("AZURE_SUBSCRIPTION_ID".to_string()))?;

        let mut config = Self::new(subscription_id);
        config.certificate_pem = std::env::var("AZURE_CERTIFICATE_PEM").ok().map(PathBuf::from);
        config.private_key_pem = std::env::var("AZURE_PRIVATE_KEY_PEM").ok().map(PathBuf::from);
        if let Ok(endpoint) = std::env::var("AZURE_MANAGEMENT_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(prefix) = std::env::var("AZURE_AFFINITY_PREFIX") {
            config.affinity_prefix = prefix;
        }
        if let Ok(prefix) = std::env::var("AZURE_CLOUD_SERVICE_PREFIX") {
            config.cloud_service_prefix = prefix;
        }
        if let Ok(prefix) = std::env::var("AZURE_STORAGE_PREFIX") {
            config.storage_prefix = prefix;
        }
        config.virtual_network = std::env::var("AZURE_VIRTUAL_NETWORK").ok();
        if let Ok(interval) = std::env::var("AZURE_POLL_INTERVAL_MS") {
            let ms = interval.parse::<u64>().map_err(|_| {
                AzureError::InvalidConfig(format!("AZURE_POLL_INTERVAL_MS is not a number: {}", interval))
            })?;
            config.poll.interval = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: AzureConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded Azure configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.trim().is_empty() {
            return Err(AzureError::InvalidConfig(
                "subscription_id must not be empty".to_string(),
            ));
        }
        if self.poll.interval.is_zero() {
            return Err(AzureError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.poll.get_attempts == 0 {
            return Err(AzureError::InvalidConfig(
                "get_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

//! Azure Service Management engine for StratoFlow
//!
//! Drives affinity groups, storage accounts, cloud services, virtual
//! networks, disks and virtual machines through the provider's
//! submit-then-poll protocol. Every operation takes an absolute
//! [`Deadline`](stratoflow_cloud::Deadline) and gives up with a timeout once
//! it has passed.
//!
//! # Requirements
//!
//! - A management certificate and key in PEM form
//! - `AZURE_SUBSCRIPTION_ID` (and optionally the other `AZURE_*` variables
//!   read by [`AzureConfig::from_env`]), or a YAML file for
//!   [`AzureConfig::from_yaml_file`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use stratoflow_cloud::Deadline;
//! use stratoflow_cloud_azure::{AzureClient, AzureConfig, DeploymentDescriptor};
//!
//! // `codec` maps documents onto the endpoint's wire format
//! let client = AzureClient::new(AzureConfig::from_env()?, Arc::new(codec))?;
//! let deadline = Deadline::after(Duration::from_secs(30 * 60));
//!
//! client.ensure_affinity_group("ag1", "West Europe", deadline).await?;
//! client.ensure_storage_account("ag1", "store1", deadline).await?;
//!
//! let mut descriptor = DeploymentDescriptor::new("web01", "ag1", "store1", os_configuration);
//! let details = client.create_virtual_machine_deployment(&mut descriptor, deadline).await?;
//! println!("{} is up at {:?}", details.id, details.private_ip);
//! ```
//!
//! # Network configuration
//!
//! ```ignore
//! use stratoflow_cloud_azure::NetworkDelta;
//!
//! let delta = NetworkDelta::new("vnet1", "ag1", "10.0.0.0/16").with_subnet("web", "10.0.0.0/24");
//! client.merge_network_change(&delta, deadline).await?;
//! ```

pub mod classify;
pub mod client;
pub mod codec;
pub mod config;
pub mod disk;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod operation;
pub mod provisioning;
pub mod rest;
pub mod teardown;
pub mod topology;
pub mod transport;
pub mod wait;

pub use classify::{Classified, ProviderError, classify};
pub use client::AzureClient;
pub use codec::{Codec, JsonCodec};
pub use config::AzureConfig;
pub use error::{AzureError, Result};
pub use operation::{OperationState, OperationStatus};
pub use provisioning::{CloudServiceTarget, DeploymentDescriptor, RoleDetails};
pub use rest::RestClient;
pub use topology::{NetworkDelta, VpnConfiguration, apply_delta};
pub use transport::{HttpMethod, HttpRequest, HttpTransport, RawResponse, Transport};

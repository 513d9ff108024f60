//! The Azure client value and its read-only queries

use crate::codec::Codec;
use crate::config::AzureConfig;
use crate::error::Result;
use crate::model::{
    AddressAvailability, AffinityGroups, Deployment, Disk, Disks, GatewayInfo, HostedService,
    HostedServices, NetworkTopology, StorageServices,
};
use crate::rest::RestClient;
use crate::transport::{HttpTransport, Transport};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stratoflow_cloud::{Deadline, SerializationLocks};

pub const NETWORK_CONFIGURATION_PATH: &str = "/services/networking/media";

/// Orchestration engine for one subscription
///
/// Share it between tasks behind an `Arc`; the serialization locks are
/// owned by this value, so two clients never exclude each other.
pub struct AzureClient {
    rest: RestClient,
    locks: SerializationLocks,
    config: AzureConfig,
    storage_accounts: Mutex<HashSet<String>>,
}

impl AzureClient {
    /// Create a client talking HTTPS to the configured endpoint
    ///
    /// Documents are written with `codec` and labelled with its content type.
    pub fn new(config: AzureConfig, codec: Arc<dyn Codec>) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport), codec))
    }

    pub fn with_transport(
        config: AzureConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            rest: RestClient::new(transport, codec, config.poll.clone()),
            locks: SerializationLocks::new(),
            config,
            storage_accounts: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    pub fn locks(&self) -> &SerializationLocks {
        &self.locks
    }

    pub(crate) fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub(crate) fn interval(&self) -> Duration {
        self.config.poll.interval
    }

    /// Cloud service name used when a deployment doesn't name one
    pub fn generated_cloud_service_name(&self, role_name: &str) -> String {
        format!("{}{}", self.config.cloud_service_prefix, role_name)
    }

    /// Storage accounts created through this client and not deleted yet
    pub fn tracked_storage_accounts(&self) -> Vec<String> {
        let accounts = self
            .storage_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<_> = accounts.iter().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn track_storage_account(&self, name: &str) {
        self.storage_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(name.to_string());
    }

    pub(crate) fn untrack_storage_account(&self, name: &str) {
        self.storage_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(name);
    }

    pub async fn list_affinity_groups(&self, deadline: Deadline) -> Result<AffinityGroups> {
        self.rest.get("/affinitygroups", deadline).await
    }

    pub async fn list_storage_services(&self, deadline: Deadline) -> Result<StorageServices> {
        self.rest.get("/services/storageservices", deadline).await
    }

    pub async fn list_hosted_services(&self, deadline: Deadline) -> Result<HostedServices> {
        self.rest.get("/services/hostedservices", deadline).await
    }

    /// Fetch a cloud service; with `embed` its deployments are included
    pub async fn get_hosted_service(
        &self,
        name: &str,
        embed: bool,
        deadline: Deadline,
    ) -> Result<Option<HostedService>> {
        let path = if embed {
            format!("/services/hostedservices/{}?embed-detail=true", name)
        } else {
            format!("/services/hostedservices/{}", name)
        };
        let service: Option<HostedService> = self.rest.get_optional(&path, deadline).await?;
        Ok(service.map(|mut service| {
            for deployment in &mut service.deployments {
                deployment.hosted_service_name = Some(service.service_name.clone());
            }
            service
        }))
    }

    pub async fn get_deployment_by_slot(
        &self,
        service: &str,
        slot: &str,
        deadline: Deadline,
    ) -> Result<Option<Deployment>> {
        let path = format!("/services/hostedservices/{}/deploymentslots/{}", service, slot);
        let deployment: Option<Deployment> = self.rest.get_optional(&path, deadline).await?;
        Ok(deployment.map(|mut d| {
            d.hosted_service_name = Some(service.to_string());
            d
        }))
    }

    pub async fn get_deployment_by_name(
        &self,
        service: &str,
        deployment: &str,
        deadline: Deadline,
    ) -> Result<Option<Deployment>> {
        let path = format!("/services/hostedservices/{}/deployments/{}", service, deployment);
        let found: Option<Deployment> = self.rest.get_optional(&path, deadline).await?;
        Ok(found.map(|mut d| {
            d.hosted_service_name = Some(service.to_string());
            d
        }))
    }

    /// Find the deployment whose role instance owns `ip`
    ///
    /// Only deployments in the configured virtual network are considered
    /// when one is set.
    pub async fn find_deployment_by_ip(
        &self,
        ip: &str,
        deadline: Deadline,
    ) -> Result<Option<Deployment>> {
        let services = self.list_hosted_services(deadline).await?;
        for summary in services.hosted_services {
            let Some(service) = self
                .get_hosted_service(&summary.service_name, true, deadline)
                .await?
            else {
                continue;
            };
            let found = service.deployments.into_iter().find(|d| {
                let in_network = match &self.config.virtual_network {
                    Some(vnet) => d.virtual_network_name.as_deref() == Some(vnet.as_str()),
                    None => true,
                };
                in_network && d.role_instance_by_ip(ip).is_some()
            });
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    pub async fn list_disks(&self, deadline: Deadline) -> Result<Disks> {
        self.rest.get("/services/disks", deadline).await
    }

    pub async fn get_disk(&self, name: &str, deadline: Deadline) -> Result<Option<Disk>> {
        let disks = self.list_disks(deadline).await?;
        Ok(disks.find(name).cloned())
    }

    /// The network configuration document; empty when none was ever written
    pub async fn network_topology(&self, deadline: Deadline) -> Result<NetworkTopology> {
        let topology: Option<NetworkTopology> = self
            .rest
            .get_optional(NETWORK_CONFIGURATION_PATH, deadline)
            .await?;
        Ok(topology.unwrap_or_default())
    }

    pub async fn gateway_info(
        &self,
        virtual_network: &str,
        deadline: Deadline,
    ) -> Result<Option<GatewayInfo>> {
        let path = format!("/services/networking/{}/gateway", virtual_network);
        self.rest.get_optional(&path, deadline).await
    }

    pub async fn check_address_availability(
        &self,
        virtual_network: &str,
        ip: &str,
        deadline: Deadline,
    ) -> Result<AddressAvailability> {
        let path = format!(
            "/services/networking/{}?op=checkavailability&address={}",
            virtual_network, ip
        );
        self.rest.get(&path, deadline).await
    }
}

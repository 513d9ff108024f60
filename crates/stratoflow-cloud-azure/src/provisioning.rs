//! Virtual machine provisioning
//!
//! ```text
//! LockWait → Resolving → Submitting → AwaitingRunning → AwaitingRoleReady
//!          → AttachingDisk → Done
//!                 any failure after LockWait → Cleanup → Failed
//! ```
//!
//! Resolving and submitting happen under the general lock so two machines
//! never race for the same cloud service or deployment. The lock is released
//! as soon as the submission settles; booting is awaited outside of it.
//! When a step fails and the cloud service was created by this call, the
//! service is deleted (best effort) and the original error is returned.

use crate::client::AzureClient;
use crate::disk::vhd_media_link;
use crate::error::{AzureError, Result};
use crate::model::{
    ConfigurationSet, InputEndpoint, NetworkConfigurationSet, NewDeployment, OsVirtualHardDisk,
    ResourceExtensionReference, Role, SLOT_PRODUCTION,
};
use serde::{Deserialize, Serialize};
use stratoflow_cloud::{ActionType, CloudError, Deadline, LockDomain};

/// Which cloud service a machine goes into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudServiceTarget {
    /// `{cloud_service_prefix}{role_name}`
    Generated,
    Named(String),
}

/// Everything needed to boot one virtual machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    pub cloud_service: CloudServiceTarget,
    pub affinity_group: String,
    pub deployment_slot: String,
    pub role_name: String,
    pub role_size: String,
    pub image_name: String,
    pub storage_account: String,
    /// Falls back to the client's virtual network
    pub network_name: Option<String>,
    pub subnet_name: Option<String>,
    /// Candidate static addresses, tried in order
    pub static_ips: Vec<String>,
    pub endpoints: Vec<InputEndpoint>,
    pub extensions: Vec<ResourceExtensionReference>,
    pub data_disk_size_gb: Option<u32>,
    /// `LinuxProvisioning` or `WindowsProvisioning`
    pub os_configuration: ConfigurationSet,
    pub domain_join: Option<ConfigurationSet>,

    /// Filled in while provisioning
    pub deployment_name: Option<String>,
    pub available_ip: Option<String>,
}

impl DeploymentDescriptor {
    pub fn new(
        role_name: impl Into<String>,
        affinity_group: impl Into<String>,
        storage_account: impl Into<String>,
        os_configuration: ConfigurationSet,
    ) -> Self {
        Self {
            cloud_service: CloudServiceTarget::Generated,
            affinity_group: affinity_group.into(),
            deployment_slot: SLOT_PRODUCTION.to_string(),
            role_name: role_name.into(),
            role_size: "Small".to_string(),
            image_name: String::new(),
            storage_account: storage_account.into(),
            network_name: None,
            subnet_name: None,
            static_ips: Vec::new(),
            endpoints: Vec::new(),
            extensions: Vec::new(),
            data_disk_size_gb: None,
            os_configuration,
            domain_join: None,
            deployment_name: None,
            available_ip: None,
        }
    }

    fn cloud_service_name(&self) -> Option<&str> {
        match &self.cloud_service {
            CloudServiceTarget::Named(name) => Some(name.as_str()),
            CloudServiceTarget::Generated => None,
        }
    }

    /// The role document submitted to the provider
    pub fn build_role(&self, cloud_service: &str) -> Role {
        let network = NetworkConfigurationSet {
            input_endpoints: self.endpoints.clone(),
            subnet_names: self.subnet_name.iter().cloned().collect(),
            static_virtual_network_ip_address: self.available_ip.clone(),
        };

        let mut configuration_sets = vec![
            self.os_configuration.clone(),
            ConfigurationSet::Network(network),
        ];
        if let Some(domain_join) = &self.domain_join {
            configuration_sets.push(domain_join.clone());
        }

        let os_vhd = format!("{}-{}-os.vhd", cloud_service, self.role_name);
        Role {
            role_name: self.role_name.clone(),
            role_type: "PersistentVMRole".to_string(),
            role_size: Some(self.role_size.clone()),
            configuration_sets,
            resource_extension_references: self.extensions.clone(),
            data_virtual_hard_disks: Vec::new(),
            os_virtual_hard_disk: Some(OsVirtualHardDisk {
                disk_name: None,
                media_link: Some(vhd_media_link(&self.storage_account, &os_vhd)),
                source_image_name: Some(self.image_name.clone()),
            }),
        }
    }
}

/// Addresses of a provisioned machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDetails {
    pub id: String,
    pub cloud_service_name: String,
    pub deployment_name: String,
    pub private_ip: Option<String>,
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Submission {
    AddRole,
    NewDeployment,
}

impl AzureClient {
    /// Provision one virtual machine and wait until it is ready
    pub async fn create_virtual_machine_deployment(
        &self,
        descriptor: &mut DeploymentDescriptor,
        deadline: Deadline,
    ) -> Result<RoleDetails> {
        let headroom = self.config().poll.boot_headroom;
        let Some(lock_budget) = deadline.budget_after(headroom) else {
            return Err(CloudError::LockTimeout(format!(
                "Aborted provisioning of {}: {}ms left before the deadline, \
                 less than the {}ms needed to boot a machine",
                descriptor.role_name,
                deadline.remaining().as_millis(),
                headroom.as_millis()
            ))
            .into());
        };

        let lock = self.locks().acquire(LockDomain::General, lock_budget).await?;
        tracing::info!("Preparing deployment of {}", descriptor.role_name);

        let mut created_service = None;
        let submitted = self
            .resolve_and_submit(descriptor, &mut created_service, deadline)
            .await;
        lock.release();

        let result = match submitted {
            Ok(service) => self.await_machine(descriptor, &service, deadline).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(details) => Ok(details),
            Err(e) => {
                tracing::warn!("Provisioning of {} failed: {}", descriptor.role_name, e);
                if let Some(service) = created_service {
                    self.clean_up_cloud_service(&service, deadline).await;
                }
                Err(e)
            }
        }
    }

    /// Returns the resolved cloud service name. `created_service` is set as
    /// soon as this call creates one, so the caller can compensate.
    async fn resolve_and_submit(
        &self,
        descriptor: &mut DeploymentDescriptor,
        created_service: &mut Option<String>,
        deadline: Deadline,
    ) -> Result<String> {
        let service = match descriptor.cloud_service_name() {
            Some(name) => name.to_string(),
            None => self.generated_cloud_service_name(&descriptor.role_name),
        };

        let submission = if self.get_hosted_service(&service, false, deadline).await?.is_some() {
            match self
                .get_deployment_by_slot(&service, &descriptor.deployment_slot, deadline)
                .await?
            {
                Some(existing) => {
                    descriptor.deployment_name = Some(existing.name);
                    Submission::AddRole
                }
                None => {
                    descriptor.deployment_name = Some(service.clone());
                    Submission::NewDeployment
                }
            }
        } else {
            if self
                .submit_cloud_service(&descriptor.affinity_group, &service, deadline)
                .await?
                == ActionType::Create
            {
                *created_service = Some(service.clone());
                self.await_cloud_service_created(&service, deadline).await?;
            }
            descriptor.deployment_name = Some(service.clone());
            Submission::NewDeployment
        };
        descriptor.cloud_service = CloudServiceTarget::Named(service.clone());

        if !descriptor.static_ips.is_empty() {
            let ip = self.reserve_static_ip(descriptor, deadline).await?;
            descriptor.available_ip = Some(ip);
        }

        let deployment = descriptor.deployment_name.clone().unwrap_or_else(|| service.clone());
        let role = descriptor.build_role(&service);
        match submission {
            Submission::AddRole => {
                tracing::info!(
                    "Adding role {} to deployment {} of {}",
                    descriptor.role_name,
                    deployment,
                    service
                );
                let path = format!("/services/hostedservices/{}/deployments/{}/roles", service, deployment);
                self.rest().post_and_wait(&path, &role, deadline).await?;
            }
            Submission::NewDeployment => {
                tracing::info!("Creating deployment {} in {}", deployment, service);
                let body = NewDeployment {
                    name: deployment.clone(),
                    deployment_slot: descriptor.deployment_slot.clone(),
                    label: deployment.clone(),
                    role_list: vec![role],
                    virtual_network_name: descriptor
                        .network_name
                        .clone()
                        .or_else(|| self.config().virtual_network.clone()),
                };
                let path = format!("/services/hostedservices/{}/deployments", service);
                self.rest().post_and_wait(&path, &body, deadline).await?;
            }
        }

        Ok(service)
    }

    /// First candidate address the provider reports as free
    async fn reserve_static_ip(
        &self,
        descriptor: &DeploymentDescriptor,
        deadline: Deadline,
    ) -> Result<String> {
        let network = descriptor
            .network_name
            .clone()
            .or_else(|| self.config().virtual_network.clone())
            .ok_or_else(|| {
                AzureError::from(CloudError::InvalidState(
                    "Static IP requested without a virtual network".to_string(),
                ))
            })?;

        let mut available = None;
        for ip in &descriptor.static_ips {
            if self
                .check_address_availability(&network, ip, deadline)
                .await?
                .is_available
            {
                available = Some(ip.clone());
                break;
            }
            tracing::debug!("Address {} is not available in {}", ip, network);
        }
        let Some(ip) = available else {
            return Err(CloudError::InvalidState(format!(
                "None of the requested addresses {:?} is available in {}",
                descriptor.static_ips, network
            ))
            .into());
        };

        let subnet = descriptor.subnet_name.as_deref().unwrap_or_default();
        let topology = self.network_topology(deadline).await?;
        if topology
            .site(&network)
            .and_then(|site| site.subnet(subnet))
            .is_none()
        {
            return Err(CloudError::InvalidState(format!(
                "Subnet '{}' does not exist in virtual network {}",
                subnet, network
            ))
            .into());
        }

        tracing::info!("Using static address {} for {}", ip, descriptor.role_name);
        Ok(ip)
    }

    async fn await_machine(
        &self,
        descriptor: &DeploymentDescriptor,
        service: &str,
        deadline: Deadline,
    ) -> Result<RoleDetails> {
        let deployment_name = descriptor
            .deployment_name
            .clone()
            .unwrap_or_else(|| service.to_string());
        let role_name = descriptor.role_name.as_str();

        tracing::info!("Waiting for {} to boot", role_name);
        self.await_deployment_running(service, &deployment_name, deadline)
            .await?;
        let deployment = self
            .await_role_ready(service, &deployment_name, role_name, deadline)
            .await?;

        if let Some(size_gb) = descriptor.data_disk_size_gb {
            self.add_data_disk_to_vm(
                service,
                &deployment_name,
                role_name,
                &descriptor.storage_account,
                size_gb,
                deadline,
            )
            .await?;
        }

        let instance = deployment.role_instance(role_name).ok_or_else(|| {
            AzureError::from(CloudError::InvalidState(format!(
                "Role {} disappeared from deployment {}",
                role_name, deployment_name
            )))
        })?;

        tracing::info!("Virtual machine {} is ready", role_name);
        Ok(RoleDetails {
            id: instance.role_name.clone(),
            cloud_service_name: service.to_string(),
            deployment_name,
            private_ip: instance.ip_address.clone(),
            public_ip: deployment
                .role(role_name)
                .and_then(Role::public_ip)
                .map(str::to_string),
        })
    }

    async fn clean_up_cloud_service(&self, service: &str, deadline: Deadline) {
        tracing::info!("Deleting cloud service {} created for the failed deployment", service);
        if let Err(e) = self.delete_cloud_service(service, deadline).await {
            tracing::warn!("Failed deleting cloud service {}: {}", service, e);
        }
    }
}

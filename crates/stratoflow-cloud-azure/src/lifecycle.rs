//! Idempotent ensure-present / ensure-absent operations
//!
//! Every call checks existence with a live listing first and only submits a
//! mutation when the desired state doesn't already hold. The returned
//! [`ActionType`] says which of the two happened.

use crate::client::AzureClient;
use crate::error::Result;
use crate::model::{
    AffinityGroup, CreateHostedService, CreateStorageService, SLOT_PRODUCTION, SLOT_STAGING,
};
use stratoflow_cloud::{ActionType, Deadline, LockDomain};

impl AzureClient {
    pub async fn ensure_affinity_group(
        &self,
        name: &str,
        location: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if self.list_affinity_groups(deadline).await?.contains(name) {
            tracing::debug!("Affinity group {} already exists", name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Creating affinity group: {} ({})", name, location);
        let body = AffinityGroup {
            name: name.to_string(),
            label: name.to_string(),
            location: location.to_string(),
        };
        self.rest()
            .post_and_wait("/affinitygroups", &body, deadline)
            .await?;
        Ok(ActionType::Create)
    }

    pub async fn delete_affinity_group(&self, name: &str, deadline: Deadline) -> Result<ActionType> {
        if !self.list_affinity_groups(deadline).await?.contains(name) {
            tracing::debug!("Affinity group {} does not exist", name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting affinity group: {}", name);
        self.rest()
            .delete_and_wait(&format!("/affinitygroups/{}", name), deadline)
            .await?;
        Ok(ActionType::Delete)
    }

    /// Create a storage account and track it for teardown
    pub async fn ensure_storage_account(
        &self,
        affinity_group: &str,
        name: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if self.list_storage_services(deadline).await?.contains(name) {
            tracing::debug!("Storage account {} already exists", name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Creating storage account: {}", name);
        let body = CreateStorageService {
            service_name: name.to_string(),
            label: name.to_string(),
            affinity_group: affinity_group.to_string(),
        };
        self.rest()
            .post_and_wait("/services/storageservices", &body, deadline)
            .await?;
        self.track_storage_account(name);
        Ok(ActionType::Create)
    }

    pub async fn delete_storage_account(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if !self.list_storage_services(deadline).await?.contains(name) {
            tracing::debug!("Storage account {} does not exist", name);
            self.untrack_storage_account(name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting storage account: {}", name);
        self.rest()
            .delete_and_wait(&format!("/services/storageservices/{}", name), deadline)
            .await?;
        self.untrack_storage_account(name);
        Ok(ActionType::Delete)
    }

    /// Create a cloud service and wait until the provider reports it `Created`
    pub async fn ensure_cloud_service(
        &self,
        affinity_group: &str,
        name: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let action = self.submit_cloud_service(affinity_group, name, deadline).await?;
        if action == ActionType::Create {
            self.await_cloud_service_created(name, deadline).await?;
        }
        Ok(action)
    }

    /// Create the cloud service without waiting for it to become `Created`.
    /// A `Create` result means the service exists on the provider from here on.
    pub(crate) async fn submit_cloud_service(
        &self,
        affinity_group: &str,
        name: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if self.list_hosted_services(deadline).await?.contains(name) {
            tracing::debug!("Cloud service {} already exists", name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Creating cloud service: {}", name);
        let body = CreateHostedService {
            service_name: name.to_string(),
            label: name.to_string(),
            affinity_group: affinity_group.to_string(),
        };
        self.rest()
            .post_and_wait("/services/hostedservices", &body, deadline)
            .await?;
        Ok(ActionType::Create)
    }

    /// Delete a cloud service that holds no deployments
    ///
    /// While either slot is occupied the call logs a warning and does
    /// nothing.
    pub async fn delete_cloud_service(&self, name: &str, deadline: Deadline) -> Result<ActionType> {
        if !self.list_hosted_services(deadline).await?.contains(name) {
            tracing::debug!("Cloud service {} does not exist", name);
            return Ok(ActionType::NoOp);
        }

        for slot in [SLOT_PRODUCTION, SLOT_STAGING] {
            if let Some(deployment) = self.get_deployment_by_slot(name, slot, deadline).await? {
                tracing::warn!(
                    "Not deleting cloud service {}: deployment {} still occupies the {} slot",
                    name,
                    deployment.name,
                    slot
                );
                return Ok(ActionType::NoOp);
            }
        }

        tracing::info!("Deleting cloud service: {}", name);
        self.rest()
            .delete_and_wait(&format!("/services/hostedservices/{}", name), deadline)
            .await?;
        Ok(ActionType::Delete)
    }

    /// Delete a disk, and its backing blob when `delete_vhd` is set
    pub async fn delete_disk(
        &self,
        name: &str,
        delete_vhd: bool,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if self.get_disk(name, deadline).await?.is_none() {
            tracing::debug!("Disk {} does not exist", name);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting disk: {}", name);
        let path = if delete_vhd {
            format!("/services/disks/{}?comp=media", name)
        } else {
            format!("/services/disks/{}", name)
        };
        self.rest().delete_and_wait(&path, deadline).await?;
        Ok(ActionType::Delete)
    }

    pub async fn delete_deployment(
        &self,
        service: &str,
        deployment: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let _lock = self
            .locks()
            .acquire(LockDomain::General, deadline.remaining())
            .await?;

        if self
            .get_deployment_by_name(service, deployment, deadline)
            .await?
            .is_none()
        {
            tracing::debug!("Deployment {} of {} does not exist", deployment, service);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting deployment: {} ({})", deployment, service);
        self.rest()
            .delete_and_wait(
                &format!("/services/hostedservices/{}/deployments/{}", service, deployment),
                deadline,
            )
            .await?;
        Ok(ActionType::Delete)
    }

    pub async fn delete_role(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let _lock = self
            .locks()
            .acquire(LockDomain::General, deadline.remaining())
            .await?;

        let exists = self
            .get_deployment_by_name(service, deployment, deadline)
            .await?
            .is_some_and(|d| d.role(role).is_some());
        if !exists {
            tracing::debug!("Role {} of {}/{} does not exist", role, service, deployment);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting role: {} ({}/{})", role, service, deployment);
        self.rest()
            .delete_and_wait(
                &format!(
                    "/services/hostedservices/{}/deployments/{}/roles/{}",
                    service, deployment, role
                ),
                deadline,
            )
            .await?;
        Ok(ActionType::Delete)
    }
}

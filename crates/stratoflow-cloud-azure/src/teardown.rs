//! Virtual machine teardown

use crate::client::AzureClient;
use crate::error::{AzureError, Result};
use stratoflow_cloud::{ActionType, CloudError, Deadline};

impl AzureClient {
    /// Delete the machine that owns `ip` together with its disks
    ///
    /// A role sharing its deployment with others is removed on its own;
    /// otherwise the whole deployment goes, followed by the cloud service and
    /// the storage accounts this client created. Disk and storage cleanup
    /// failures are logged, not returned.
    pub async fn delete_virtual_machine_by_ip(&self, ip: &str, deadline: Deadline) -> Result<()> {
        let deployment = self
            .find_deployment_by_ip(ip, deadline)
            .await?
            .ok_or_else(|| {
                AzureError::from(CloudError::ResourceNotFound(format!(
                    "No deployment has a role with address {}",
                    ip
                )))
            })?;
        let service = deployment.hosted_service_name.clone().ok_or_else(|| {
            AzureError::Protocol(format!("deployment {} has no cloud service", deployment.name))
        })?;
        let role = deployment
            .role_instance_by_ip(ip)
            .and_then(|instance| deployment.role(&instance.role_name))
            .ok_or_else(|| {
                AzureError::from(CloudError::ResourceNotFound(format!(
                    "No role with address {} in deployment {}",
                    ip, deployment.name
                )))
            })?;

        let disks: Vec<String> = role
            .os_virtual_hard_disk
            .iter()
            .filter_map(|d| d.disk_name.clone())
            .chain(
                role.data_virtual_hard_disks
                    .iter()
                    .filter_map(|d| d.disk_name.clone()),
            )
            .collect();

        tracing::info!("Deleting virtual machine {} ({})", role.role_name, ip);
        let whole_deployment = deployment.role_list.len() < 2;
        if whole_deployment {
            self.delete_deployment(&service, &deployment.name, deadline)
                .await?;
        } else {
            self.delete_role(&service, &deployment.name, &role.role_name, deadline)
                .await?;
        }
        self.delete_cloud_service(&service, deadline).await?;

        self.delete_released_disks(&disks, deadline).await;

        if whole_deployment {
            for account in self.tracked_storage_accounts() {
                if let Err(e) = self.delete_storage_account(&account, deadline).await {
                    tracing::warn!("Failed deleting storage account {}: {}", account, e);
                }
            }
        }
        Ok(())
    }

    /// Delete a deployment, its cloud service and every disk attached to it
    pub async fn delete_virtual_machine_by_deployment(
        &self,
        service: &str,
        deployment: &str,
        deadline: Deadline,
    ) -> Result<()> {
        let disks: Vec<String> = self
            .list_disks(deadline)
            .await?
            .attached_to_service(service)
            .map(|d| d.name.clone())
            .collect();
        if disks.is_empty() {
            return Err(CloudError::InvalidState(format!(
                "No disks are attached to cloud service {}",
                service
            ))
            .into());
        }

        tracing::info!("Deleting deployment {} of {}", deployment, service);
        self.delete_deployment(service, deployment, deadline).await?;
        self.delete_cloud_service(service, deadline).await?;

        for disk in &disks {
            self.await_disk_detached(disk, deadline).await?;
            self.delete_disk(disk, true, deadline).await?;
        }
        Ok(())
    }

    async fn delete_released_disks(&self, disks: &[String], deadline: Deadline) {
        for disk in disks {
            let deleted = match self.await_disk_detached(disk, deadline).await {
                Ok(()) => self.delete_disk(disk, true, deadline).await,
                Err(e) => Err(e),
            };
            match deleted {
                Ok(ActionType::Delete) => tracing::debug!("Deleted disk {}", disk),
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed deleting disk {}: {}", disk, e),
            }
        }
    }
}

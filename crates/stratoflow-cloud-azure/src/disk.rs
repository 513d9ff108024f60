//! Data disk operations
//!
//! Attaching disks to roles goes through the storage lock. The provider
//! can't create a disk without attaching it, so [`AzureClient::create_data_disk`]
//! attaches a fresh blob at a scratch LUN, reads back the generated disk
//! name and detaches it again.

use crate::client::AzureClient;
use crate::error::{AzureError, Result};
use crate::model::{DataVirtualHardDisk, MAX_LUN, UpdateDisk};
use stratoflow_cloud::{ActionType, CloudError, Deadline, LockDomain};

/// LUN used for disks added along with a new machine
pub const DEFAULT_DATA_DISK_LUN: u8 = 0;

/// Scratch LUN for the create-then-detach sequence
pub const SCRATCH_LUN: u8 = MAX_LUN;

/// Label given to every newly created data disk
pub const DATA_DISK_LABEL: &str = "Data";

pub fn validate_lun(lun: u8) -> Result<()> {
    if lun > MAX_LUN {
        return Err(CloudError::InvalidState(format!(
            "LUN {} is out of range, expected 0 to {}",
            lun, MAX_LUN
        ))
        .into());
    }
    Ok(())
}

pub fn vhd_media_link(storage_account: &str, vhd_name: &str) -> String {
    format!("https://{}.blob.core.windows.net/vhds/{}", storage_account, vhd_name)
}

/// `{service}-{role}-data-{4 random chars}.vhd`
pub fn generate_vhd_name(service: &str, role: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-data-{}.vhd", service, role, &suffix[..4])
}

fn data_disks_path(service: &str, deployment: &str, role: &str) -> String {
    format!(
        "/services/hostedservices/{}/deployments/{}/roles/{}/DataDisks",
        service, deployment, role
    )
}

impl AzureClient {
    pub async fn get_data_disk(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        lun: u8,
        deadline: Deadline,
    ) -> Result<Option<DataVirtualHardDisk>> {
        validate_lun(lun)?;
        let path = format!("{}/{}", data_disks_path(service, deployment, role), lun);
        self.rest().get_optional(&path, deadline).await
    }

    async fn submit_data_disk(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        disk: &DataVirtualHardDisk,
        deadline: Deadline,
    ) -> Result<DataVirtualHardDisk> {
        self.rest()
            .post_and_wait(&data_disks_path(service, deployment, role), disk, deadline)
            .await?;
        self.await_data_disk_attached(service, deployment, role, disk.lun, deadline)
            .await
    }

    async fn detach_data_disk_unlocked(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        lun: u8,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let Some(disk) = self
            .get_data_disk(service, deployment, role, lun, deadline)
            .await?
        else {
            tracing::debug!("No data disk at LUN {} of role {}", lun, role);
            return Ok(ActionType::NoOp);
        };

        tracing::info!("Detaching data disk at LUN {} from role {}", lun, role);
        let path = format!("{}/{}", data_disks_path(service, deployment, role), lun);
        self.rest().delete_and_wait(&path, deadline).await?;
        if let Some(name) = &disk.disk_name {
            self.await_disk_detached(name, deadline).await?;
        }
        Ok(ActionType::Delete)
    }

    /// Attach a new empty data disk at LUN 0
    pub async fn add_data_disk_to_vm(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        storage_account: &str,
        size_gb: u32,
        deadline: Deadline,
    ) -> Result<DataVirtualHardDisk> {
        let _lock = self
            .locks()
            .acquire(LockDomain::Storage, deadline.remaining())
            .await?;

        let vhd = generate_vhd_name(service, role);
        tracing::info!("Adding {}GB data disk {} to role {}", size_gb, vhd, role);
        let disk = DataVirtualHardDisk {
            lun: DEFAULT_DATA_DISK_LUN,
            logical_disk_size_in_gb: Some(size_gb),
            media_link: Some(vhd_media_link(storage_account, &vhd)),
            disk_label: Some(DATA_DISK_LABEL.to_string()),
            ..Default::default()
        };
        self.submit_data_disk(service, deployment, role, &disk, deadline)
            .await
    }

    /// Attach an existing disk at `lun`
    pub async fn attach_data_disk(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        disk_name: &str,
        lun: u8,
        deadline: Deadline,
    ) -> Result<DataVirtualHardDisk> {
        validate_lun(lun)?;
        let _lock = self
            .locks()
            .acquire(LockDomain::Storage, deadline.remaining())
            .await?;

        tracing::info!("Attaching disk {} to role {} at LUN {}", disk_name, role, lun);
        let disk = DataVirtualHardDisk {
            disk_name: Some(disk_name.to_string()),
            lun,
            ..Default::default()
        };
        self.submit_data_disk(service, deployment, role, &disk, deadline)
            .await
    }

    /// Detach whatever disk sits at `lun` and wait until it is released
    pub async fn detach_data_disk(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        lun: u8,
        deadline: Deadline,
    ) -> Result<ActionType> {
        validate_lun(lun)?;
        self.detach_data_disk_unlocked(service, deployment, role, lun, deadline)
            .await
    }

    /// Create an unattached data disk backed by `vhd_name` and return its name
    pub async fn create_data_disk(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        storage_account: &str,
        vhd_name: &str,
        size_gb: u32,
        deadline: Deadline,
    ) -> Result<String> {
        let _lock = self
            .locks()
            .acquire(LockDomain::Storage, deadline.remaining())
            .await?;

        if self
            .get_data_disk(service, deployment, role, SCRATCH_LUN, deadline)
            .await?
            .is_some()
        {
            return Err(CloudError::InvalidState(format!(
                "LUN {} of role {} is already in use",
                SCRATCH_LUN, role
            ))
            .into());
        }

        tracing::info!("Creating data disk {} through role {}", vhd_name, role);
        let disk = DataVirtualHardDisk {
            lun: SCRATCH_LUN,
            logical_disk_size_in_gb: Some(size_gb),
            media_link: Some(vhd_media_link(storage_account, vhd_name)),
            disk_label: Some(DATA_DISK_LABEL.to_string()),
            ..Default::default()
        };
        let attached = self
            .submit_data_disk(service, deployment, role, &disk, deadline)
            .await?;
        let name = attached.disk_name.ok_or_else(|| {
            AzureError::Protocol(format!(
                "data disk at LUN {} of role {} has no name",
                SCRATCH_LUN, role
            ))
        })?;

        self.detach_data_disk_unlocked(service, deployment, role, SCRATCH_LUN, deadline)
            .await?;
        Ok(name)
    }

    pub async fn update_disk_label(
        &self,
        name: &str,
        label: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let Some(disk) = self.get_disk(name, deadline).await? else {
            return Err(CloudError::ResourceNotFound(format!("Disk {} does not exist", name)).into());
        };
        if disk.label.as_deref() == Some(label) {
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Updating label of disk {}", name);
        let body = UpdateDisk {
            name: name.to_string(),
            label: label.to_string(),
        };
        let request_id = self
            .rest()
            .put(
                &format!("/services/disks/{}", name),
                &body,
                self.rest().codec().content_type(),
                deadline,
            )
            .await?;
        self.rest().await_operation(&request_id, deadline).await?;
        Ok(ActionType::Update)
    }
}

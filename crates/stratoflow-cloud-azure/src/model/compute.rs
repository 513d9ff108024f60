//! Affinity groups, cloud services, deployments and roles

use serde::{Deserialize, Serialize};

pub const SLOT_PRODUCTION: &str = "Production";
pub const SLOT_STAGING: &str = "Staging";

pub const DEPLOYMENT_RUNNING: &str = "Running";
pub const ROLE_READY: &str = "ReadyRole";
pub const CLOUD_SERVICE_CREATED: &str = "Created";

/// Role statuses after which a role never becomes ready
pub const FAILED_ROLE_STATUSES: [&str; 4] = [
    "FailedStartingRole",
    "FailedStartingVM",
    "UnresponsiveRole",
    "CyclingRole",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AffinityGroup {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AffinityGroups {
    #[serde(default)]
    pub affinity_groups: Vec<AffinityGroup>,
}

impl AffinityGroups {
    pub fn contains(&self, name: &str) -> bool {
        self.affinity_groups.iter().any(|g| g.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedServiceProperties {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub affinity_group: Option<String>,
    #[serde(default)]
    pub label: String,
}

/// A cloud service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedService {
    pub service_name: String,
    #[serde(default)]
    pub hosted_service_properties: HostedServiceProperties,
    /// Only filled when fetched with `embed-detail=true`
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

impl HostedService {
    pub fn status(&self) -> &str {
        &self.hosted_service_properties.status
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedServices {
    #[serde(default)]
    pub hosted_services: Vec<HostedService>,
}

impl HostedServices {
    pub fn contains(&self, name: &str) -> bool {
        self.hosted_services.iter().any(|s| s.service_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateHostedService {
    pub service_name: String,
    pub label: String,
    pub affinity_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleInstance {
    pub role_name: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub instance_status: String,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deployment {
    pub name: String,
    #[serde(default)]
    pub deployment_slot: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub role_instance_list: Vec<RoleInstance>,
    #[serde(default)]
    pub role_list: Vec<Role>,
    #[serde(default)]
    pub virtual_network_name: Option<String>,
    /// Not part of the document; set when the deployment was found through a
    /// cloud service listing
    #[serde(skip)]
    pub hosted_service_name: Option<String>,
}

impl Deployment {
    pub fn role(&self, role_name: &str) -> Option<&Role> {
        self.role_list.iter().find(|r| r.role_name == role_name)
    }

    pub fn role_instance(&self, role_name: &str) -> Option<&RoleInstance> {
        self.role_instance_list
            .iter()
            .find(|i| i.role_name == role_name)
    }

    pub fn role_instance_by_ip(&self, ip: &str) -> Option<&RoleInstance> {
        self.role_instance_list
            .iter()
            .find(|i| i.ip_address.as_deref() == Some(ip))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDeployment {
    pub name: String,
    pub deployment_slot: String,
    pub label: String,
    pub role_list: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_network_name: Option<String>,
}

/// A persistent virtual machine role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    pub role_name: String,
    #[serde(default = "persistent_vm_role")]
    pub role_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_size: Option<String>,
    #[serde(default)]
    pub configuration_sets: Vec<ConfigurationSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_extension_references: Vec<ResourceExtensionReference>,
    #[serde(default)]
    pub data_virtual_hard_disks: Vec<DataVirtualHardDisk>,
    #[serde(
        rename = "OSVirtualHardDisk",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub os_virtual_hard_disk: Option<OsVirtualHardDisk>,
}

fn persistent_vm_role() -> String {
    "PersistentVMRole".to_string()
}

impl Role {
    pub fn network_configuration(&self) -> Option<&NetworkConfigurationSet> {
        self.configuration_sets.iter().find_map(|set| match set {
            ConfigurationSet::Network(network) => Some(network),
            _ => None,
        })
    }

    /// VIP of the first input endpoint of the network configuration
    pub fn public_ip(&self) -> Option<&str> {
        self.network_configuration()?
            .input_endpoints
            .first()?
            .vip
            .as_deref()
    }
}

/// Configuration attached to a role, one variant per kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ConfigurationSetType")]
pub enum ConfigurationSet {
    #[serde(rename = "NetworkConfiguration")]
    Network(NetworkConfigurationSet),
    #[serde(rename = "LinuxProvisioningConfiguration")]
    LinuxProvisioning(LinuxProvisioningSet),
    #[serde(rename = "WindowsProvisioningConfiguration")]
    WindowsProvisioning(WindowsProvisioningSet),
    #[serde(rename = "DomainJoinConfiguration")]
    DomainJoin(DomainJoinSet),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkConfigurationSet {
    #[serde(default)]
    pub input_endpoints: Vec<InputEndpoint>,
    #[serde(default)]
    pub subnet_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_virtual_network_ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputEndpoint {
    pub name: String,
    pub protocol: String,
    pub port: u16,
    pub local_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinuxProvisioningSet {
    pub host_name: String,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
    #[serde(default)]
    pub disable_ssh_password_authentication: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WindowsProvisioningSet {
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: String,
    #[serde(default)]
    pub enable_automatic_updates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainJoinSet {
    pub domain: String,
    pub user_name: String,
    pub password: String,
    pub join_domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceExtensionReference {
    pub reference_name: String,
    pub publisher: String,
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OsVirtualHardDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataVirtualHardDisk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_name: Option<String>,
    #[serde(default)]
    pub lun: u8,
    #[serde(
        rename = "LogicalDiskSizeInGB",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub logical_disk_size_in_gb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_label: Option<String>,
}

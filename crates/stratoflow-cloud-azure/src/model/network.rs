//! Network topology document, gateways and address availability

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DnsServer {
    pub name: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dns {
    #[serde(default)]
    pub dns_servers: Vec<DnsServer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

impl AddressSpace {
    pub fn single(prefix: impl Into<String>) -> Self {
        Self {
            address_prefixes: vec![prefix.into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalNetworkSite {
    pub name: String,
    #[serde(default)]
    pub address_space: AddressSpace,
    #[serde(default)]
    pub vpn_gateway_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Subnet {
    pub name: String,
    pub address_prefix: String,
}

impl Subnet {
    pub fn new(name: impl Into<String>, address_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address_prefix: address_prefix.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedReference {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Gateway {
    #[serde(default)]
    pub connections_to_local_network: Vec<NamedReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualNetworkSite {
    pub name: String,
    #[serde(default)]
    pub affinity_group: String,
    #[serde(default)]
    pub address_space: AddressSpace,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub dns_servers_ref: Vec<NamedReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Gateway>,
}

impl VirtualNetworkSite {
    pub fn subnet(&self, name: &str) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.name == name)
    }
}

/// The subscription-wide network configuration document
///
/// There is exactly one per subscription and it can only be replaced as a
/// whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkTopology {
    #[serde(default)]
    pub dns: Dns,
    #[serde(default)]
    pub local_network_sites: Vec<LocalNetworkSite>,
    #[serde(default)]
    pub virtual_network_sites: Vec<VirtualNetworkSite>,
}

impl NetworkTopology {
    pub fn site(&self, name: &str) -> Option<&VirtualNetworkSite> {
        self.virtual_network_sites.iter().find(|s| s.name == name)
    }

    pub fn site_mut(&mut self, name: &str) -> Option<&mut VirtualNetworkSite> {
        self.virtual_network_sites
            .iter_mut()
            .find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressAvailability {
    pub is_available: bool,
    #[serde(default)]
    pub available_addresses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayState {
    NotProvisioned,
    Provisioning,
    Provisioned,
    Deprovisioning,
}

impl std::fmt::Display for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayState::NotProvisioned => write!(f, "NotProvisioned"),
            GatewayState::Provisioning => write!(f, "Provisioning"),
            GatewayState::Provisioned => write!(f, "Provisioned"),
            GatewayState::Deprovisioning => write!(f, "Deprovisioning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GatewayInfo {
    pub state: GatewayState,
    #[serde(rename = "VIPAddress", default, skip_serializing_if = "Option::is_none")]
    pub vip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGatewayParameters {
    pub gateway_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SharedKey {
    pub value: String,
}

//! Network topology merger
//!
//! The subscription has a single network configuration document. Every
//! change is a full read-modify-write under the network lock, and the write
//! is skipped entirely when the merge finds nothing to add.

use crate::client::{AzureClient, NETWORK_CONFIGURATION_PATH};
use crate::error::Result;
use crate::model::{
    AddressSpace, CreateGatewayParameters, DnsServer, Gateway, GatewayState, LocalNetworkSite,
    NamedReference, NetworkTopology, SharedKey, Subnet, VirtualNetworkSite,
};
use crate::transport::CONTENT_TYPE_TEXT;
use stratoflow_cloud::{ActionType, CloudError, Deadline, LockDomain};

/// Subnet name the provider requires for VPN gateways
pub const GATEWAY_SUBNET: &str = "GatewaySubnet";

/// Site-to-site VPN to add to a virtual network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpnConfiguration {
    pub local_site: LocalNetworkSite,
    pub gateway_subnet_prefix: String,
    pub gateway_type: String,
    pub shared_key: String,
}

/// What a virtual network site should contain after a merge
///
/// Items already present (matched by name) are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkDelta {
    pub site_name: String,
    pub affinity_group: String,
    pub address_space: String,
    pub subnets: Vec<Subnet>,
    pub dns_servers: Vec<DnsServer>,
    pub vpn: Option<VpnConfiguration>,
}

impl NetworkDelta {
    pub fn new(
        site_name: impl Into<String>,
        affinity_group: impl Into<String>,
        address_space: impl Into<String>,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            affinity_group: affinity_group.into(),
            address_space: address_space.into(),
            ..Default::default()
        }
    }

    pub fn with_subnet(mut self, name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.subnets.push(Subnet::new(name, prefix));
        self
    }

    pub fn with_dns_server(mut self, name: impl Into<String>, ip: impl Into<String>) -> Self {
        self.dns_servers.push(DnsServer {
            name: name.into(),
            ip_address: ip.into(),
        });
        self
    }

    pub fn with_vpn(mut self, vpn: VpnConfiguration) -> Self {
        self.vpn = Some(vpn);
        self
    }
}

/// Merge `delta` into `topology`, returning whether anything changed
pub fn apply_delta(topology: &mut NetworkTopology, delta: &NetworkDelta) -> bool {
    let mut changed = false;

    for server in &delta.dns_servers {
        if !topology.dns.dns_servers.iter().any(|s| s.name == server.name) {
            topology.dns.dns_servers.push(server.clone());
            changed = true;
        }
    }

    if let Some(vpn) = &delta.vpn {
        if !topology
            .local_network_sites
            .iter()
            .any(|s| s.name == vpn.local_site.name)
        {
            topology.local_network_sites.push(vpn.local_site.clone());
            changed = true;
        }
    }

    if topology.site(&delta.site_name).is_none() {
        topology.virtual_network_sites.push(VirtualNetworkSite {
            name: delta.site_name.clone(),
            affinity_group: delta.affinity_group.clone(),
            address_space: AddressSpace::single(delta.address_space.clone()),
            ..Default::default()
        });
        changed = true;
    }
    let Some(site) = topology.site_mut(&delta.site_name) else {
        return changed;
    };

    for subnet in &delta.subnets {
        if site.subnet(&subnet.name).is_none() {
            site.subnets.push(subnet.clone());
            changed = true;
        }
    }

    for server in &delta.dns_servers {
        if !site.dns_servers_ref.iter().any(|r| r.name == server.name) {
            site.dns_servers_ref.push(NamedReference {
                name: server.name.clone(),
            });
            changed = true;
        }
    }

    if let Some(vpn) = &delta.vpn {
        if site.subnet(GATEWAY_SUBNET).is_none() {
            site.subnets
                .push(Subnet::new(GATEWAY_SUBNET, vpn.gateway_subnet_prefix.clone()));
            changed = true;
        }
        let gateway = site.gateway.get_or_insert_with(|| {
            changed = true;
            Gateway::default()
        });
        if !gateway
            .connections_to_local_network
            .iter()
            .any(|c| c.name == vpn.local_site.name)
        {
            gateway.connections_to_local_network.push(NamedReference {
                name: vpn.local_site.name.clone(),
            });
            changed = true;
        }
    }

    changed
}

impl AzureClient {
    async fn write_topology(&self, topology: &NetworkTopology, deadline: Deadline) -> Result<()> {
        let request_id = self
            .rest()
            .put(NETWORK_CONFIGURATION_PATH, topology, CONTENT_TYPE_TEXT, deadline)
            .await?;
        self.rest().await_operation(&request_id, deadline).await
    }

    /// Merge a change into the network configuration
    ///
    /// Returns `Update` when the document was rewritten and `NoOp` when the
    /// delta was already present. VPN setup runs afterwards, outside the
    /// network lock.
    pub async fn merge_network_change(
        &self,
        delta: &NetworkDelta,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let action = {
            let _lock = self
                .locks()
                .acquire(LockDomain::Network, deadline.remaining())
                .await?;

            let mut topology = self.network_topology(deadline).await?;
            if apply_delta(&mut topology, delta) {
                tracing::info!("Updating network configuration for site {}", delta.site_name);
                self.write_topology(&topology, deadline).await?;
                ActionType::Update
            } else {
                tracing::debug!("Network configuration for {} is up to date", delta.site_name);
                ActionType::NoOp
            }
        };

        if let Some(vpn) = &delta.vpn {
            self.configure_vpn(&delta.site_name, vpn, deadline).await?;
        }
        Ok(action)
    }

    async fn configure_vpn(
        &self,
        site: &str,
        vpn: &VpnConfiguration,
        deadline: Deadline,
    ) -> Result<()> {
        let gateway_path = format!("/services/networking/{}/gateway", site);

        match self.gateway_info(site, deadline).await? {
            Some(info) if info.state == GatewayState::NotProvisioned => {
                tracing::info!("Creating gateway for virtual network {}", site);
                let body = CreateGatewayParameters {
                    gateway_type: vpn.gateway_type.clone(),
                };
                self.rest()
                    .post_and_wait(&gateway_path, &body, deadline)
                    .await?;
                self.await_gateway_provisioned(site, deadline).await?;
            }
            Some(info) => {
                tracing::warn!("Gateway of {} is {}, not creating it", site, info.state);
            }
            None => tracing::warn!("No gateway information for {}, not creating it", site),
        }

        match self.gateway_info(site, deadline).await? {
            Some(info) if info.state == GatewayState::Provisioned => {
                tracing::info!(
                    "Setting shared key for connection {} -> {}",
                    site,
                    vpn.local_site.name
                );
                let path = format!(
                    "{}/connection/{}/sharedkey",
                    gateway_path, vpn.local_site.name
                );
                let body = SharedKey {
                    value: vpn.shared_key.clone(),
                };
                self.rest().post_and_wait(&path, &body, deadline).await?;
            }
            Some(info) => {
                tracing::warn!("Gateway of {} is {}, not setting the shared key", site, info.state);
            }
            None => tracing::warn!("No gateway information for {}, not setting the shared key", site),
        }

        Ok(())
    }

    /// Create a virtual network site if it is missing
    pub async fn ensure_virtual_network_site(
        &self,
        name: &str,
        affinity_group: &str,
        address_space: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let delta = NetworkDelta::new(name, affinity_group, address_space);
        match self.merge_network_change(&delta, deadline).await? {
            ActionType::NoOp => Ok(ActionType::NoOp),
            _ => Ok(ActionType::Create),
        }
    }

    /// Add a subnet to an existing site
    pub async fn add_subnet(
        &self,
        site: &str,
        subnet: &str,
        address_prefix: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let _lock = self
            .locks()
            .acquire(LockDomain::Network, deadline.remaining())
            .await?;

        let mut topology = self.network_topology(deadline).await?;
        let Some(vnet) = topology.site_mut(site) else {
            return Err(CloudError::InvalidState(format!(
                "Virtual network site {} does not exist",
                site
            ))
            .into());
        };
        if vnet.subnet(subnet).is_some() {
            tracing::debug!("Subnet {} already exists in {}", subnet, site);
            return Ok(ActionType::NoOp);
        }
        vnet.subnets.push(Subnet::new(subnet, address_prefix));

        tracing::info!("Adding subnet {} ({}) to {}", subnet, address_prefix, site);
        self.write_topology(&topology, deadline).await?;
        Ok(ActionType::Update)
    }

    pub async fn remove_subnet(
        &self,
        site: &str,
        subnet: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        let _lock = self
            .locks()
            .acquire(LockDomain::Network, deadline.remaining())
            .await?;

        let mut topology = self.network_topology(deadline).await?;
        let Some(vnet) = topology.site_mut(site) else {
            tracing::warn!("Virtual network site {} does not exist, nothing to remove", site);
            return Ok(ActionType::NoOp);
        };
        let before = vnet.subnets.len();
        vnet.subnets.retain(|s| s.name != subnet);
        if vnet.subnets.len() == before {
            tracing::warn!("Subnet {} does not exist in {}, nothing to remove", subnet, site);
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Removing subnet {} from {}", subnet, site);
        self.write_topology(&topology, deadline).await?;
        Ok(ActionType::Update)
    }

    /// Delete a virtual network site, tearing down its gateway first
    pub async fn delete_virtual_network_site(
        &self,
        name: &str,
        deadline: Deadline,
    ) -> Result<ActionType> {
        if self.network_topology(deadline).await?.site(name).is_none() {
            tracing::debug!("Virtual network site {} does not exist", name);
            return Ok(ActionType::NoOp);
        }

        if let Some(info) = self.gateway_info(name, deadline).await? {
            if info.state != GatewayState::NotProvisioned {
                tracing::info!("Deleting gateway of virtual network {}", name);
                self.rest()
                    .delete_and_wait(&format!("/services/networking/{}/gateway", name), deadline)
                    .await?;
                self.await_gateway_deprovisioned(name, deadline).await?;
            }
        }

        let _lock = self
            .locks()
            .acquire(LockDomain::Network, deadline.remaining())
            .await?;

        let mut topology = self.network_topology(deadline).await?;
        let before = topology.virtual_network_sites.len();
        topology.virtual_network_sites.retain(|s| s.name != name);
        if topology.virtual_network_sites.len() == before {
            return Ok(ActionType::NoOp);
        }

        tracing::info!("Deleting virtual network site: {}", name);
        self.write_topology(&topology, deadline).await?;
        Ok(ActionType::Delete)
    }
}

//! Resource-state pollers
//!
//! Each waits on [`await_state`] with the client's polling interval, so they
//! share the same timeout message format and deadline handling.

use crate::client::AzureClient;
use crate::error::Result;
use crate::model::{
    CLOUD_SERVICE_CREATED, DEPLOYMENT_RUNNING, DataVirtualHardDisk, Deployment,
    FAILED_ROLE_STATUSES, GatewayState, ROLE_READY,
};
use stratoflow_cloud::{Deadline, PollStep, await_state};

const NOT_FOUND: &str = "NotFound";

/// Ready / pending / fatal for a role instance status
pub fn role_status_step(status: &str) -> PollStep<()> {
    if status == ROLE_READY {
        PollStep::Ready(())
    } else if FAILED_ROLE_STATUSES.contains(&status) {
        PollStep::Fatal(format!("role instance is in status {}", status))
    } else {
        PollStep::Pending(status.to_string())
    }
}

pub fn gateway_provisioned_step(state: Option<GatewayState>) -> PollStep<()> {
    match state {
        Some(GatewayState::Provisioned) => PollStep::Ready(()),
        Some(s @ (GatewayState::NotProvisioned | GatewayState::Provisioning)) => {
            PollStep::Pending(s.to_string())
        }
        Some(GatewayState::Deprovisioning) => {
            PollStep::Fatal("gateway is being deprovisioned".to_string())
        }
        None => PollStep::Fatal("virtual network has no gateway".to_string()),
    }
}

pub fn gateway_deprovisioned_step(state: Option<GatewayState>) -> PollStep<()> {
    match state {
        None | Some(GatewayState::NotProvisioned) => PollStep::Ready(()),
        Some(GatewayState::Provisioning) => {
            PollStep::Fatal("gateway is being provisioned".to_string())
        }
        Some(s) => PollStep::Pending(s.to_string()),
    }
}

impl AzureClient {
    pub async fn await_deployment_running(
        &self,
        service: &str,
        deployment: &str,
        deadline: Deadline,
    ) -> Result<Deployment> {
        let what = format!("deployment {} to be {}", deployment, DEPLOYMENT_RUNNING);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.get_deployment_by_name(service, deployment, deadline),
            |found: Option<Deployment>| match found {
                Some(d) if d.status == DEPLOYMENT_RUNNING => PollStep::Ready(d),
                Some(d) => PollStep::Pending(d.status),
                None => PollStep::Pending(NOT_FOUND.to_string()),
            },
        )
        .await
    }

    /// Wait for a role instance to report `ReadyRole`
    ///
    /// Statuses from which a role never recovers fail immediately.
    pub async fn await_role_ready(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        deadline: Deadline,
    ) -> Result<Deployment> {
        let what = format!("role {} to be {}", role, ROLE_READY);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.get_deployment_by_name(service, deployment, deadline),
            |found: Option<Deployment>| {
                let Some(d) = found else {
                    return PollStep::Pending(NOT_FOUND.to_string());
                };
                let status = match d.role_instance(role) {
                    Some(instance) => instance.instance_status.clone(),
                    None => return PollStep::Pending(NOT_FOUND.to_string()),
                };
                match role_status_step(&status) {
                    PollStep::Ready(()) => PollStep::Ready(d),
                    PollStep::Pending(s) => PollStep::Pending(s),
                    PollStep::Fatal(reason) => PollStep::Fatal(reason),
                }
            },
        )
        .await
    }

    /// Wait for a disk to be released by its role; a missing disk is fatal
    pub async fn await_disk_detached(&self, disk: &str, deadline: Deadline) -> Result<()> {
        let what = format!("disk {} to detach", disk);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.get_disk(disk, deadline),
            |found| match found {
                None => PollStep::Fatal("disk does not exist".to_string()),
                Some(d) => match d.attached_to {
                    Some(a) => PollStep::Pending(format!("attached to {}", a.role_name)),
                    None => PollStep::Ready(()),
                },
            },
        )
        .await
    }

    pub async fn await_data_disk_attached(
        &self,
        service: &str,
        deployment: &str,
        role: &str,
        lun: u8,
        deadline: Deadline,
    ) -> Result<DataVirtualHardDisk> {
        let path = format!(
            "/services/hostedservices/{}/deployments/{}/roles/{}/DataDisks/{}",
            service, deployment, role, lun
        );
        let path = path.as_str();
        let what = format!("data disk at LUN {} of role {}", lun, role);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.rest().get_optional::<DataVirtualHardDisk>(path, deadline),
            |found| match found {
                Some(disk) => PollStep::Ready(disk),
                None => PollStep::Pending(NOT_FOUND.to_string()),
            },
        )
        .await
    }

    pub async fn await_cloud_service_created(&self, name: &str, deadline: Deadline) -> Result<()> {
        let what = format!("cloud service {} to be {}", name, CLOUD_SERVICE_CREATED);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.get_hosted_service(name, false, deadline),
            |found| match found {
                Some(s) if s.status() == CLOUD_SERVICE_CREATED => PollStep::Ready(()),
                Some(s) => PollStep::Pending(s.status().to_string()),
                None => PollStep::Pending(NOT_FOUND.to_string()),
            },
        )
        .await
    }

    pub async fn await_gateway_provisioned(
        &self,
        virtual_network: &str,
        deadline: Deadline,
    ) -> Result<()> {
        let what = format!("gateway of {} to be provisioned", virtual_network);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.gateway_info(virtual_network, deadline),
            |info| gateway_provisioned_step(info.map(|i| i.state)),
        )
        .await
    }

    pub async fn await_gateway_deprovisioned(
        &self,
        virtual_network: &str,
        deadline: Deadline,
    ) -> Result<()> {
        let what = format!("gateway of {} to be deprovisioned", virtual_network);
        await_state(
            deadline,
            self.interval(),
            &what,
            move || self.gateway_info(virtual_network, deadline),
            |info| gateway_deprovisioned_step(info.map(|i| i.state)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_status_step() {
        assert_eq!(role_status_step("ReadyRole"), PollStep::Ready(()));
        assert_eq!(
            role_status_step("Provisioning"),
            PollStep::Pending("Provisioning".to_string())
        );
        for status in FAILED_ROLE_STATUSES {
            assert!(matches!(role_status_step(status), PollStep::Fatal(_)));
        }
    }

    #[test]
    fn test_gateway_provisioned_step() {
        assert_eq!(
            gateway_provisioned_step(Some(GatewayState::Provisioned)),
            PollStep::Ready(())
        );
        assert!(matches!(
            gateway_provisioned_step(Some(GatewayState::Provisioning)),
            PollStep::Pending(_)
        ));
        assert!(matches!(
            gateway_provisioned_step(Some(GatewayState::Deprovisioning)),
            PollStep::Fatal(_)
        ));
        assert!(matches!(gateway_provisioned_step(None), PollStep::Fatal(_)));
    }

    #[test]
    fn test_gateway_deprovisioned_step() {
        assert_eq!(gateway_deprovisioned_step(None), PollStep::Ready(()));
        assert_eq!(
            gateway_deprovisioned_step(Some(GatewayState::NotProvisioned)),
            PollStep::Ready(())
        );
        assert!(matches!(
            gateway_deprovisioned_step(Some(GatewayState::Provisioning)),
            PollStep::Fatal(_)
        ));
        assert!(matches!(
            gateway_deprovisioned_step(Some(GatewayState::Deprovisioning)),
            PollStep::Pending(_)
        ));
    }
}

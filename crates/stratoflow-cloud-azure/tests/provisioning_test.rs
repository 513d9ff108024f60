mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stratoflow_cloud::{CloudError, Deadline, LockDomain};
use stratoflow_cloud_azure::model::{ConfigurationSet, LinuxProvisioningSet};
use stratoflow_cloud_azure::{AzureClient, CloudServiceTarget, DeploymentDescriptor, JsonCodec};

const SERVICES: &str = "/services/hostedservices";

fn descriptor(role: &str) -> DeploymentDescriptor {
    let mut descriptor = DeploymentDescriptor::new(
        role,
        "ag1",
        "store1",
        ConfigurationSet::LinuxProvisioning(LinuxProvisioningSet {
            host_name: role.to_string(),
            user_name: "admin".to_string(),
            user_password: Some("Passw0rd!".to_string()),
            disable_ssh_password_authentication: false,
        }),
    );
    descriptor.image_name = "ubuntu-14.04".to_string();
    descriptor.subnet_name = Some("web".to_string());
    descriptor
}

fn service_path(service: &str) -> String {
    format!("{}/{}", SERVICES, service)
}

/// Script a cloud service that doesn't exist yet and gets created
fn script_new_cloud_service(transport: &FakeTransport, service: &str, request_id: &str) {
    // first lookup: missing; afterwards it reports Created
    transport.error(Get, &service_path(service), 404, "ResourceNotFound", "no such service");
    transport.json(
        Get,
        &service_path(service),
        json!({"ServiceName": service, "HostedServiceProperties": {"Status": "Created"}}),
    );
    transport.succeed(Post, SERVICES, request_id);
}

fn script_service_listing(transport: &FakeTransport, services: &[&str]) {
    transport.json(Get, SERVICES, json!({"HostedServices": []}));
    let listed: Vec<_> = services.iter().map(|s| json!({"ServiceName": s})).collect();
    transport.json(Get, SERVICES, json!({"HostedServices": listed}));
}

fn script_running(transport: &FakeTransport, service: &str, role: &str, ip: &str) {
    transport.json(
        Get,
        &format!("{}/deployments/{}", service_path(service), service),
        running_deployment(service, role, "ReadyRole", ip),
    );
}

#[tokio::test]
async fn test_new_deployment_succeeds() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.succeed(Post, &format!("{}/deployments", service_path("cs-web01")), "req-1");
    script_running(&transport, "cs-web01", "web01", "10.0.0.4");
    let client = client(&transport);

    let mut descriptor = descriptor("web01");
    let details = client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap();

    assert_eq!(details.id, "web01");
    assert_eq!(details.cloud_service_name, "cs-web01");
    assert_eq!(details.deployment_name, "cs-web01");
    assert_eq!(details.private_ip.as_deref(), Some("10.0.0.4"));
    assert_eq!(details.public_ip.as_deref(), Some("137.116.1.1"));

    assert_eq!(descriptor.cloud_service, CloudServiceTarget::Named("cs-web01".to_string()));
    assert_eq!(descriptor.deployment_name.as_deref(), Some("cs-web01"));

    let body = transport
        .last_body(Post, &format!("{}/deployments", service_path("cs-web01")))
        .unwrap();
    assert_eq!(body["DeploymentSlot"], "Production");
    assert_eq!(body["VirtualNetworkName"], "vnet1");
    assert_eq!(body["RoleList"][0]["RoleName"], "web01");

    assert!(!client.locks().is_locked(LockDomain::General));
    assert_eq!(transport.count(Delete, &service_path("cs-web01")), 0);
}

#[tokio::test]
async fn test_failed_submission_deletes_new_cloud_service_once() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.accept(Post, &format!("{}/deployments", service_path("cs-web01")), "req-2");
    transport.failed_operation("req-2", "BadRequest", "X");
    transport.succeed(Delete, &service_path("cs-web01"), "req-del");
    let client = client(&transport);

    let err = client
        .create_virtual_machine_deployment(&mut descriptor("web01"), Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap_err();

    assert_eq!(
        err.cloud(),
        Some(&CloudError::OperationFailed {
            code: "BadRequest".to_string(),
            message: "X".to_string()
        })
    );
    assert_eq!(transport.count(Delete, &service_path("cs-web01")), 1);
    assert!(!client.locks().is_locked(LockDomain::General));
}

#[tokio::test(start_paused = true)]
async fn test_cloud_service_stuck_creating_is_deleted() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    transport.error(Get, &service_path("cs-web01"), 404, "ResourceNotFound", "no such service");
    transport.json(
        Get,
        &service_path("cs-web01"),
        json!({"ServiceName": "cs-web01", "HostedServiceProperties": {"Status": "Creating"}}),
    );
    transport.succeed(Post, SERVICES, "req-cs");
    transport.succeed(Delete, &service_path("cs-web01"), "req-del");
    let client = client(&transport);

    let err = client
        .create_virtual_machine_deployment(&mut descriptor("web01"), Deadline::after(Duration::from_secs(61)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(transport.count(Post, SERVICES), 1);
    assert_eq!(transport.count(Post, &format!("{}/deployments", service_path("cs-web01"))), 0);
    assert_eq!(transport.count(Delete, &service_path("cs-web01")), 1);
}

#[tokio::test]
async fn test_unavailable_static_ip_fails_before_submission() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.json(
        Get,
        "/services/networking/vnet1?op=checkavailability&address=10.0.0.12",
        json!({"IsAvailable": false, "AvailableAddresses": ["10.0.0.13"]}),
    );
    transport.succeed(Delete, &service_path("cs-web01"), "req-del");
    let client = client(&transport);

    let mut descriptor = descriptor("web01");
    descriptor.static_ips = vec!["10.0.0.12".to_string()];
    let err = client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap_err();

    match err.cloud() {
        Some(CloudError::InvalidState(msg)) => assert!(msg.contains("10.0.0.12")),
        other => panic!("expected InvalidState, got {:?}", other),
    }
    assert_eq!(transport.count(Post, &format!("{}/deployments", service_path("cs-web01"))), 0);
    assert_eq!(transport.count(Delete, &service_path("cs-web01")), 1);
}

#[tokio::test]
async fn test_static_ip_requires_existing_subnet() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.json(
        Get,
        "/services/networking/vnet1?op=checkavailability&address=10.0.0.12",
        json!({"IsAvailable": true}),
    );
    transport.json(
        Get,
        "/services/networking/media",
        json!({"VirtualNetworkSites": [{"Name": "vnet1", "Subnets": [{"Name": "db", "AddressPrefix": "10.0.1.0/24"}]}]}),
    );
    transport.succeed(Delete, &service_path("cs-web01"), "req-del");
    let client = client(&transport);

    let mut descriptor = descriptor("web01");
    descriptor.static_ips = vec!["10.0.0.12".to_string()];
    let err = client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap_err();

    match err.cloud() {
        Some(CloudError::InvalidState(msg)) => assert!(msg.contains("web")),
        other => panic!("expected InvalidState, got {:?}", other),
    }
    assert_eq!(transport.count(Post, &format!("{}/deployments", service_path("cs-web01"))), 0);
}

#[tokio::test]
async fn test_static_ip_is_submitted() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.json(
        Get,
        "/services/networking/vnet1?op=checkavailability&address=10.0.0.11",
        json!({"IsAvailable": false}),
    );
    transport.json(
        Get,
        "/services/networking/vnet1?op=checkavailability&address=10.0.0.12",
        json!({"IsAvailable": true}),
    );
    transport.json(
        Get,
        "/services/networking/media",
        json!({"VirtualNetworkSites": [{"Name": "vnet1", "Subnets": [{"Name": "web", "AddressPrefix": "10.0.0.0/24"}]}]}),
    );
    transport.succeed(Post, &format!("{}/deployments", service_path("cs-web01")), "req-1");
    script_running(&transport, "cs-web01", "web01", "10.0.0.12");
    let client = client(&transport);

    let mut descriptor = descriptor("web01");
    descriptor.static_ips = vec!["10.0.0.11".to_string(), "10.0.0.12".to_string()];
    client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap();

    assert_eq!(descriptor.available_ip.as_deref(), Some("10.0.0.12"));
    let body = transport
        .last_body(Post, &format!("{}/deployments", service_path("cs-web01")))
        .unwrap();
    let network = &body["RoleList"][0]["ConfigurationSets"][1];
    assert_eq!(network["ConfigurationSetType"], "NetworkConfiguration");
    assert_eq!(network["StaticVirtualNetworkIpAddress"], "10.0.0.12");
}

#[tokio::test]
async fn test_existing_cloud_service_is_never_deleted() {
    let transport = FakeTransport::new();
    transport.json(
        Get,
        &service_path("shared"),
        json!({"ServiceName": "shared", "HostedServiceProperties": {"Status": "Created"}}),
    );
    transport.json(
        Get,
        &format!("{}/deploymentslots/Production", service_path("shared")),
        json!({"Name": "shared-prod", "DeploymentSlot": "Production", "Status": "Running"}),
    );
    let roles = format!("{}/deployments/shared-prod/roles", service_path("shared"));
    transport.accept(Post, &roles, "req-3");
    transport.failed_operation("req-3", "BadRequest", "role size not allowed");
    let client = client(&transport);

    let mut descriptor = descriptor("web02");
    descriptor.cloud_service = CloudServiceTarget::Named("shared".to_string());
    let err = client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap_err();

    assert!(matches!(err.cloud(), Some(CloudError::OperationFailed { .. })));
    assert_eq!(transport.count(Post, &roles), 1);
    assert_eq!(descriptor.deployment_name.as_deref(), Some("shared-prod"));
    assert!(
        transport
            .requests()
            .iter()
            .all(|r| r.method != Delete),
        "a pre-existing cloud service must not be touched"
    );
}

#[tokio::test]
async fn test_bad_role_status_short_circuits() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.succeed(Post, &format!("{}/deployments", service_path("cs-web01")), "req-1");
    transport.json(
        Get,
        &format!("{}/deployments/cs-web01", service_path("cs-web01")),
        running_deployment("cs-web01", "web01", "FailedStartingVM", "10.0.0.4"),
    );
    transport.json(
        Get,
        &format!("{}/deploymentslots/Production", service_path("cs-web01")),
        running_deployment("cs-web01", "web01", "FailedStartingVM", "10.0.0.4"),
    );
    let client = client(&transport);

    let started = tokio::time::Instant::now();
    let err = client
        .create_virtual_machine_deployment(&mut descriptor("web01"), Deadline::after(Duration::from_secs(600)))
        .await
        .unwrap_err();

    match err.cloud() {
        Some(CloudError::InvalidState(msg)) => assert!(msg.contains("FailedStartingVM")),
        other => panic!("expected InvalidState, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    // the deployment still occupies the service, so cleanup refuses to delete it
    assert_eq!(transport.count(Delete, &service_path("cs-web01")), 0);
}

#[tokio::test]
async fn test_insufficient_headroom_fails_fast() {
    let transport = FakeTransport::new();
    let client = client(&transport);

    // boot headroom is one minute in the test configuration
    let err = client
        .create_virtual_machine_deployment(&mut descriptor("web01"), Deadline::after(Duration::from_secs(30)))
        .await
        .unwrap_err();

    assert!(err.is_lock_timeout());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_data_disk_is_attached_at_lun_zero() {
    let transport = FakeTransport::new();
    script_service_listing(&transport, &["cs-web01"]);
    script_new_cloud_service(&transport, "cs-web01", "req-cs");
    transport.succeed(Post, &format!("{}/deployments", service_path("cs-web01")), "req-1");
    script_running(&transport, "cs-web01", "web01", "10.0.0.4");
    let data_disks = format!("{}/deployments/cs-web01/roles/web01/DataDisks", service_path("cs-web01"));
    transport.succeed(Post, &data_disks, "req-dd");
    transport.json(
        Get,
        &format!("{}/0", data_disks),
        json!({"DiskName": "cs-web01-web01-0-201401010000", "Lun": 0, "LogicalDiskSizeInGB": 20}),
    );
    let client = client(&transport);

    let mut descriptor = descriptor("web01");
    descriptor.data_disk_size_gb = Some(20);
    client
        .create_virtual_machine_deployment(&mut descriptor, Deadline::after(Duration::from_secs(120)))
        .await
        .unwrap();

    let body = transport.last_body(Post, &data_disks).unwrap();
    assert_eq!(body["Lun"], 0);
    assert_eq!(body["LogicalDiskSizeInGB"], 20);
    assert_eq!(body["DiskLabel"], "Data");
    let media_link = body["MediaLink"].as_str().unwrap();
    assert!(media_link.starts_with("https://store1.blob.core.windows.net/vhds/cs-web01-web01-data-"));
    assert!(!client.locks().is_locked(LockDomain::Storage));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_provisioning_serializes_submission() {
    let transport = FakeTransport::new();
    transport.json(Get, SERVICES, json!({"HostedServices": []}));
    for (role, request_id) in [("web01", "req-a"), ("web02", "req-b")] {
        let service = format!("cs-{}", role);
        transport.error(Get, &service_path(&service), 404, "ResourceNotFound", "no such service");
        transport.json(
            Get,
            &service_path(&service),
            json!({"ServiceName": service, "HostedServiceProperties": {"Status": "Created"}}),
        );
        // submission takes a while so the second caller has to queue
        transport.on(
            Post,
            &format!("{}/deployments", service_path(&service)),
            Reply::Delayed(Duration::from_secs(30), response(202, Some(request_id), &json!({}))),
        );
        transport.operation(request_id, "Succeeded");
        script_running(&transport, &service, role, "10.0.0.4");
    }
    transport.succeed(Post, SERVICES, "req-cs");

    let config = test_config().with_boot_headroom(Duration::from_secs(5 * 60));
    let client = Arc::new(AzureClient::with_transport(config, transport.clone(), Arc::new(JsonCodec)));
    let deadline = Deadline::after(Duration::from_secs(10 * 60));

    let first = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .create_virtual_machine_deployment(&mut descriptor("web01"), deadline)
                .await
        })
    };
    // let the first caller take the lock
    tokio::time::sleep(Duration::from_millis(1)).await;
    let second = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .create_virtual_machine_deployment(&mut descriptor("web02"), deadline)
                .await
        })
    };

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let first_submitted = transport.position(Get, "/operations/req-a").unwrap();
    let second_started = transport.position(Get, &service_path("cs-web02")).unwrap();
    assert!(
        first_submitted < second_started,
        "second caller must wait until the first submission completed"
    );
}

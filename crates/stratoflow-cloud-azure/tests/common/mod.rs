use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stratoflow_cloud_azure::{
    AzureClient, AzureConfig, AzureError, HttpMethod, HttpRequest, JsonCodec, RawResponse,
    Transport,
};

#[allow(unused_imports)]
pub use HttpMethod::{Delete, Get, Post, Put};

#[derive(Debug, Clone)]
pub enum Reply {
    Respond(RawResponse),
    /// Respond after the given (tokio) delay
    Delayed(Duration, RawResponse),
    ConnectionError,
}

/// Scripted in-memory transport
///
/// Replies are queued per method and path (query included). The last queued
/// reply for a route is repeated; unscripted routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, method: HttpMethod, path: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn json(&self, method: HttpMethod, path: &str, body: Value) {
        self.on(method, path, Reply::Respond(response(200, None, &body)));
    }

    /// Accept a mutation with the given operation id
    pub fn accept(&self, method: HttpMethod, path: &str, request_id: &str) {
        self.on(
            method,
            path,
            Reply::Respond(RawResponse {
                status: 202,
                request_id: Some(request_id.to_string()),
                body: Vec::new(),
            }),
        );
    }

    pub fn error(&self, method: HttpMethod, path: &str, status: u16, code: &str, message: &str) {
        self.on(
            method,
            path,
            Reply::Respond(response(
                status,
                None,
                &json!({"Code": code, "Message": message}),
            )),
        );
    }

    pub fn operation(&self, request_id: &str, status: &str) {
        self.json(
            Get,
            &format!("/operations/{}", request_id),
            json!({"ID": request_id, "Status": status, "HttpStatusCode": 200}),
        );
    }

    pub fn failed_operation(&self, request_id: &str, code: &str, message: &str) {
        self.json(
            Get,
            &format!("/operations/{}", request_id),
            json!({
                "ID": request_id,
                "Status": "Failed",
                "HttpStatusCode": 400,
                "Error": {"Code": code, "Message": message}
            }),
        );
    }

    /// Accept a mutation whose operation succeeds on the first poll
    pub fn succeed(&self, method: HttpMethod, path: &str, request_id: &str) {
        self.accept(method, path, request_id);
        self.operation(request_id, "Succeeded");
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn mutations(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutating())
            .collect()
    }

    /// Position of the first matching request in the log
    pub fn position(&self, method: HttpMethod, path: &str) -> Option<usize> {
        self.requests()
            .iter()
            .position(|r| r.method == method && r.path == path)
    }

    pub fn last_body(&self, method: HttpMethod, path: &str) -> Option<Value> {
        self.requests()
            .iter()
            .rev()
            .find(|r| r.method == method && r.path == path)
            .and_then(|r| r.body.as_ref())
            .map(|b| serde_json::from_slice(b).unwrap())
    }

    fn next_reply(&self, request: &HttpRequest) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&(request.method, request.path.clone()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> stratoflow_cloud_azure::Result<RawResponse> {
        self.log.lock().unwrap().push(request.clone());
        match self.next_reply(&request) {
            Some(Reply::Respond(r)) => Ok(r),
            Some(Reply::Delayed(delay, r)) => {
                tokio::time::sleep(delay).await;
                Ok(r)
            }
            Some(Reply::ConnectionError) => Err(AzureError::Connection(format!(
                "{} {}: connection refused",
                request.method, request.path
            ))),
            None => Ok(response(
                404,
                None,
                &json!({"Code": "ResourceNotFound", "Message": "The resource was not found"}),
            )),
        }
    }
}

pub fn response(status: u16, request_id: Option<&str>, body: &Value) -> RawResponse {
    RawResponse {
        status,
        request_id: request_id.map(str::to_string),
        body: serde_json::to_vec(body).unwrap(),
    }
}

pub fn test_config() -> AzureConfig {
    AzureConfig::new("sub-test")
        .with_poll_interval(Duration::from_millis(10))
        .with_boot_headroom(Duration::from_secs(60))
        .with_cloud_service_prefix("cs-")
        .with_virtual_network("vnet1")
}

pub fn client(transport: &Arc<FakeTransport>) -> AzureClient {
    init_tracing();
    AzureClient::with_transport(test_config(), transport.clone(), Arc::new(JsonCodec))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A running single-role deployment document
#[allow(dead_code)]
pub fn running_deployment(name: &str, role: &str, instance_status: &str, ip: &str) -> Value {
    json!({
        "Name": name,
        "DeploymentSlot": "Production",
        "Status": "Running",
        "VirtualNetworkName": "vnet1",
        "RoleInstanceList": [
            {"RoleName": role, "InstanceName": role, "InstanceStatus": instance_status, "IpAddress": ip}
        ],
        "RoleList": [{
            "RoleName": role,
            "ConfigurationSets": [{
                "ConfigurationSetType": "NetworkConfiguration",
                "InputEndpoints": [
                    {"Name": "ssh", "Protocol": "tcp", "Port": 22, "LocalPort": 22, "Vip": "137.116.1.1"}
                ],
                "SubnetNames": ["web"]
            }],
            "DataVirtualHardDisks": [],
            "OSVirtualHardDisk": {"DiskName": format!("{}-os", role)}
        }]
    })
}

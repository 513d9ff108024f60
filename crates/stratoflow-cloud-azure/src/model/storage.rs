//! Storage accounts and disks

use serde::{Deserialize, Serialize};

/// Highest LUN a role can address
pub const MAX_LUN: u8 = 15;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageService {
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageServices {
    #[serde(default)]
    pub storage_services: Vec<StorageService>,
}

impl StorageServices {
    pub fn contains(&self, name: &str) -> bool {
        self.storage_services.iter().any(|s| s.service_name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateStorageService {
    pub service_name: String,
    pub label: String,
    pub affinity_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedTo {
    pub hosted_service_name: String,
    pub deployment_name: String,
    pub role_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Disk {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<AttachedTo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
    #[serde(rename = "OS", default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

impl Disk {
    pub fn is_attached_to_service(&self, service: &str) -> bool {
        self.attached_to
            .as_ref()
            .is_some_and(|a| a.hosted_service_name == service)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Disks {
    #[serde(default)]
    pub disks: Vec<Disk>,
}

impl Disks {
    pub fn find(&self, name: &str) -> Option<&Disk> {
        self.disks.iter().find(|d| d.name == name)
    }

    pub fn attached_to_service<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a Disk> {
        self.disks
            .iter()
            .filter(move |d| d.is_attached_to_service(service))
    }
}

/// Body of `PUT /services/disks/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDisk {
    pub name: String,
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attached_to_service() {
        let disks: Disks = serde_json::from_str(
            r#"{"Disks": [
                {"Name": "web-os", "OS": "Linux",
                 "AttachedTo": {"HostedServiceName": "web", "DeploymentName": "web", "RoleName": "web"}},
                {"Name": "orphan"},
                {"Name": "db-os",
                 "AttachedTo": {"HostedServiceName": "db", "DeploymentName": "db", "RoleName": "db"}}
            ]}"#,
        )
        .unwrap();

        let names: Vec<_> = disks.attached_to_service("web").map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["web-os"]);
        assert!(disks.find("orphan").unwrap().attached_to.is_none());
        assert_eq!(disks.find("web-os").unwrap().os.as_deref(), Some("Linux"));
    }
}

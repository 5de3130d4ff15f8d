//! Workload instances bound to one client key.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

use super::{ClientKey, Recipe};

/// What the control plane remembers about an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub name: String,
    pub workload: Uuid,
    pub key: ClientKey,
    pub client_ip: Ipv4Addr,
    pub created: DateTime<Utc>,
}

impl InstanceRecord {
    /// Total order used to pick a single survivor among duplicates: the
    /// oldest record wins, the name breaks ties.
    pub fn precedes(&self, other: &InstanceRecord) -> bool {
        (self.created, &self.name) < (other.created, &other.name)
    }
}

/// A record together with the recipe it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub record: InstanceRecord,
    pub recipe: Recipe,
}

impl Instance {
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceStatus {
    Deployed,
    Expired,
}

/// The tunnel endpoint a site offers its clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTunnel {
    pub public_key: String,
    pub endpoint: String,
    pub dns: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "allowedIPs")]
    pub allowed_ips: Vec<String>,
    pub endpoint: String,
    pub address: Vec<String>,
    pub dns: Vec<String>,
}

/// Wire form of an instance returned by the site's deploy routes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "DeploymentName")]
    pub name: String,
    #[serde(rename = "UUID")]
    pub workload: Uuid,
    #[serde(rename = "ApplicationKey")]
    pub key: String,
    #[serde(rename = "Status")]
    pub status: InstanceStatus,
    #[serde(rename = "Created")]
    pub created: String,
    #[serde(rename = "TunnelConfig")]
    pub tunnel: TunnelConfig,
}

impl InstanceInfo {
    pub fn new(record: &InstanceRecord, status: InstanceStatus, tunnel: &SiteTunnel) -> Self {
        Self {
            name: record.name.clone(),
            workload: record.workload,
            key: record.key.to_string(),
            status,
            created: record.created.to_rfc3339_opts(SecondsFormat::Secs, true),
            tunnel: TunnelConfig {
                public_key: tunnel.public_key.clone(),
                allowed_ips: vec!["0.0.0.0/0".to_string()],
                endpoint: tunnel.endpoint.clone(),
                address: vec![record.client_ip.to_string()],
                dns: vec![
                    tunnel.dns.to_string(),
                    format!("{}.svc.cluster.local", record.name),
                    "svc.cluster.local".to_string(),
                    "cluster.local".to_string(),
                ],
            },
        }
    }
}

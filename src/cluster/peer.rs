//! Tunnel peer resources and the labels that identify instances.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use uuid::Uuid;

use crate::model::{ClientKey, InstanceRecord};

pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_WORKLOAD: &str = "cloudletd.io/workload";
pub const LABEL_KEY: &str = "cloudletd.io/key";
pub const LABEL_CLIENT: &str = "cloudletd.io/client";
pub const ANNOTATION_CREATED: &str = "cloudletd.io/created";
pub const ANNOTATION_CHART: &str = "cloudletd.io/chart";
pub const MANAGER: &str = "cloudletd";

pub const PEER_API_VERSION: &str = "kilo.squat.ai/v1alpha1";
pub const PEER_KIND: &str = "Peer";
pub const PERSISTENT_KEEPALIVE: u32 = 10;

/// A tunnel peer as stored by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerResource {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub public_key: ClientKey,
    pub allowed_ips: Vec<String>,
}

impl PeerResource {
    /// Peer for a new instance of `workload` bound to `key`.
    pub fn for_instance(
        name: &str,
        workload: Uuid,
        key: ClientKey,
        client_ip: Ipv4Addr,
        chart: &str,
        created: DateTime<Utc>,
    ) -> Self {
        let labels = BTreeMap::from([
            (LABEL_MANAGED_BY.to_string(), MANAGER.to_string()),
            (LABEL_WORKLOAD.to_string(), workload.to_string()),
            (LABEL_KEY.to_string(), key.label()),
            (LABEL_CLIENT.to_string(), client_ip.to_string()),
        ]);
        let annotations = BTreeMap::from([
            (
                ANNOTATION_CREATED.to_string(),
                created.to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
            (ANNOTATION_CHART.to_string(), chart.to_string()),
        ]);
        Self {
            name: name.to_string(),
            labels,
            annotations,
            public_key: key,
            allowed_ips: vec![format!("{}/32", client_ip)],
        }
    }

    /// Reads the instance identity back from labels and annotations.
    /// Peers not created by us, or with damaged labels, yield `None`.
    pub fn record(&self) -> Option<InstanceRecord> {
        if self.labels.get(LABEL_MANAGED_BY).map(String::as_str) != Some(MANAGER) {
            return None;
        }
        let workload = self.labels.get(LABEL_WORKLOAD)?.parse::<Uuid>().ok()?;
        let key = ClientKey::parse(self.labels.get(LABEL_KEY)?).ok()?;
        let client_ip = self.labels.get(LABEL_CLIENT)?.parse::<Ipv4Addr>().ok()?;
        let created = DateTime::parse_from_rfc3339(self.annotations.get(ANNOTATION_CREATED)?)
            .ok()?
            .with_timezone(&Utc);
        Some(InstanceRecord {
            name: self.name.clone(),
            workload,
            key,
            client_ip,
            created,
        })
    }

    /// Kubernetes manifest of the peer.
    pub fn to_manifest(&self) -> Value {
        json!({
            "apiVersion": PEER_API_VERSION,
            "kind": PEER_KIND,
            "metadata": {
                "name": self.name,
                "labels": self.labels,
                "annotations": self.annotations,
            },
            "spec": {
                "allowedIPs": self.allowed_ips,
                "publicKey": self.public_key.to_string(),
                "persistentKeepalive": PERSISTENT_KEEPALIVE,
            },
        })
    }

    pub fn from_manifest(manifest: &Value) -> Option<Self> {
        let metadata = manifest.get("metadata")?;
        let spec = manifest.get("spec")?;
        Some(Self {
            name: metadata.get("name")?.as_str()?.to_string(),
            labels: string_map(metadata.get("labels")),
            annotations: string_map(metadata.get("annotations")),
            public_key: ClientKey::parse(spec.get("publicKey")?.as_str()?).ok()?,
            allowed_ips: spec
                .get("allowedIPs")
                .and_then(Value::as_array)
                .map(|ips| {
                    ips.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Equality based label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(Vec<(String, String)>);

impl LabelSelector {
    /// Every peer managed by this service.
    pub fn managed() -> Self {
        Self(vec![(LABEL_MANAGED_BY.to_string(), MANAGER.to_string())])
    }

    /// Peers of one (workload, key) pair.
    pub fn instance(workload: Uuid, key: &ClientKey) -> Self {
        Self::managed()
            .with(LABEL_WORKLOAD, &workload.to_string())
            .with(LABEL_KEY, &key.label())
    }

    pub fn with(mut self, label: &str, value: &str) -> Self {
        self.0.push((label.to_string(), value.to_string()));
        self
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0
            .iter()
            .all(|(k, v)| labels.get(k).map(String::as_str) == Some(v.as_str()))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&parts.join(","))
    }
}

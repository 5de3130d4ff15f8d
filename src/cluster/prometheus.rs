//! Resource and liveness signals read from a Prometheus query API.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::http::client::{make_method_request, to_uri, HyperClient};
use crate::model::ClientKey;

/// Named scalar queries reported as site resources.
pub const RESOURCE_QUERIES: &[(&str, &str)] = &[
    (
        "cpu_ratio",
        r#"sum(rate(node_cpu_seconds_total{mode!="idle"}[1m])) / sum(node:node_num_cpu:sum)"#,
    ),
    (
        "mem_ratio",
        "sum(1 - (node_memory_MemAvailable_bytes / node_memory_MemTotal_bytes)) / count(node_memory_MemTotal_bytes)",
    ),
    ("net_rx_rate", "instance:node_network_receive_bytes_excluding_lo:rate5m"),
    ("net_tx_rate", "instance:node_network_transmit_bytes_excluding_lo:rate5m"),
    ("gpu_ratio", "sum(DCGM_FI_DEV_GPU_UTIL) / count(DCGM_FI_DEV_GPU_UTIL)"),
];

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Best effort snapshot; failing queries are left out.
    async fn resources(&self) -> BTreeMap<String, f64>;

    /// Keys with a tunnel handshake at or after `cutoff`.
    async fn active_peers(&self, cutoff: DateTime<Utc>) -> anyhow::Result<HashSet<ClientKey>>;
}

pub struct PrometheusSource {
    client: HyperClient,
    query_url: Url,
}

impl PrometheusSource {
    pub fn new(client: HyperClient, base: &Url) -> anyhow::Result<Self> {
        let query_url = base.join("api/v1/query")?;
        Ok(Self { client, query_url })
    }

    async fn query(&self, expr: &str) -> anyhow::Result<Value> {
        let body = format!("query={}", urlencoding::encode(expr));
        let (status, _, bytes) = make_method_request(
            &self.client,
            hyper::Method::POST,
            to_uri(&self.query_url)?,
            &[("content-type", "application/x-www-form-urlencoded")],
            Some(Bytes::from(body)),
            QUERY_TIMEOUT,
        )
        .await?;
        if !(200..300).contains(&status) {
            anyhow::bail!("prometheus answered {}", status);
        }
        let doc: Value = serde_json::from_slice(&bytes)?;
        if doc.get("status").and_then(Value::as_str) != Some("success") {
            anyhow::bail!("prometheus query failed");
        }
        doc.get("data")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("prometheus answer has no data"))
    }
}

#[async_trait]
impl MetricsSource for PrometheusSource {
    async fn resources(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        for (name, expr) in RESOURCE_QUERIES {
            match self.query(&format!("scalar({})", expr)).await {
                Ok(data) => match parse_scalar(&data) {
                    Some(value) => {
                        out.insert(name.to_string(), value);
                    }
                    None => {
                        warn!(component = "prometheus", event = "resource_missing", resource = name);
                    }
                },
                Err(e) => {
                    warn!(component = "prometheus", event = "resource_failed", resource = name, error = %e);
                }
            }
        }
        out
    }

    async fn active_peers(&self, cutoff: DateTime<Utc>) -> anyhow::Result<HashSet<ClientKey>> {
        let expr = format!(
            "wireguard_last_handshake_seconds>={} or delta(wireguard_latest_handshake_seconds[5m])!=0",
            cutoff.timestamp()
        );
        let data = self.query(&expr).await?;
        parse_peer_keys(&data)
    }
}

/// Extracts a finite value from a `scalar` result.
pub fn parse_scalar(data: &Value) -> Option<f64> {
    if data.get("resultType").and_then(Value::as_str) != Some("scalar") {
        return None;
    }
    let value = data.get("result")?.get(1)?;
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Collects the `public_key` label of every sample of a vector result.
pub fn parse_peer_keys(data: &Value) -> anyhow::Result<HashSet<ClientKey>> {
    if data.get("resultType").and_then(Value::as_str) != Some("vector") {
        anyhow::bail!("expected a vector result");
    }
    let samples = data
        .get("result")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("vector result is not an array"))?;

    Ok(samples
        .iter()
        .filter_map(|s| s.get("metric")?.get("public_key")?.as_str())
        .filter_map(|k| ClientKey::parse(k).ok())
        .collect())
}

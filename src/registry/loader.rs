//! Turns static site files and registrations into complete sites.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::geo::GeoLocator;
use crate::model::{Site, SiteDescriptor, SiteDraft};
use crate::net;

/// Parses a multi-document YAML stream of site descriptors. Empty documents
/// are skipped.
pub fn parse_sites(text: &str) -> Result<Vec<SiteDescriptor>> {
    let mut out = Vec::new();
    for (idx, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .with_context(|| format!("sites document #{idx} is not valid YAML"))?;
        if value.is_null() {
            continue;
        }
        let desc: SiteDescriptor = serde_yaml::from_value(value)
            .with_context(|| format!("sites document #{idx} is not a valid site"))?;
        out.push(desc);
    }
    Ok(out)
}

pub async fn read_sites_file(path: impl AsRef<Path>) -> Result<Vec<SiteDescriptor>> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read sites file {:?}", path))?;
    parse_sites(&text).with_context(|| format!("failed to parse sites file {:?}", path))
}

/// Fills site defaults that depend on the outside world: the endpoint's
/// addresses and where they are.
#[derive(Clone)]
pub struct SiteResolver {
    locator: Arc<dyn GeoLocator>,
}

impl SiteResolver {
    pub fn new(locator: Arc<dyn GeoLocator>) -> Self {
        Self { locator }
    }

    pub async fn resolve(&self, draft: SiteDraft) -> Site {
        let addresses = if draft.needs_addresses() {
            endpoint_addresses(&draft.endpoint).await
        } else {
            Vec::new()
        };
        let located = addresses
            .iter()
            .filter_map(|addr| self.locator.locate(*addr))
            .collect();
        draft.finish(&addresses, located)
    }
}

/// Globally routable addresses of the endpoint host. Lookup failures leave
/// the list empty.
async fn endpoint_addresses(endpoint: &Url) -> Vec<IpAddr> {
    let resolved: Vec<IpAddr> = match endpoint.host() {
        Some(Host::Ipv4(addr)) => vec![IpAddr::V4(addr)],
        Some(Host::Ipv6(addr)) => vec![IpAddr::V6(addr)],
        Some(Host::Domain(domain)) => {
            let port = endpoint.port_or_known_default().unwrap_or(80);
            match tokio::net::lookup_host((domain, port)).await {
                Ok(addrs) => addrs.map(|sa| sa.ip()).collect(),
                Err(e) => {
                    warn!(
                        component = "registry",
                        event = "resolve_failed",
                        endpoint = %endpoint,
                        error = %e,
                        "failed to resolve site endpoint"
                    );
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let mut global: Vec<IpAddr> = resolved.into_iter().filter(|a| net::is_global(*a)).collect();
    global.sort();
    global.dedup();

    debug!(
        component = "registry",
        event = "resolved",
        endpoint = %endpoint,
        addresses = ?global,
        "site endpoint resolved"
    );
    global
}

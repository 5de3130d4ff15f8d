//! Execution sites known to the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use url::Url;
use uuid::Uuid;

use crate::geo::GeoLocation;
use crate::net::IpNetwork;

/// A cloudlet the directory can route clients to.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    /// Base url of the site's deploy route.
    pub endpoint: Url,
    pub locations: Vec<GeoLocation>,
    pub local_networks: Vec<IpNetwork>,
    pub accepted_clients: Vec<IpNetwork>,
    pub rejected_clients: Vec<IpNetwork>,
    pub resources: BTreeMap<String, f64>,
    /// `None` for statically configured sites, which never go stale.
    pub last_update: Option<DateTime<Utc>>,
}

impl Site {
    /// A site with nothing but an identity and an endpoint; accepts everyone.
    pub fn new(id: Uuid, endpoint: Url) -> Self {
        Self {
            id,
            name: default_name(&endpoint),
            endpoint,
            locations: Vec::new(),
            local_networks: Vec::new(),
            accepted_clients: accept_all(),
            rejected_clients: Vec::new(),
            resources: BTreeMap::new(),
            last_update: None,
        }
    }

    pub fn is_rejected(&self, addr: IpAddr) -> bool {
        self.rejected_clients.iter().any(|n| n.contains(addr))
    }

    pub fn is_local(&self, addr: IpAddr) -> bool {
        self.local_networks.iter().any(|n| n.contains(addr))
    }

    pub fn is_accepted(&self, addr: IpAddr) -> bool {
        self.accepted_clients.iter().any(|n| n.contains(addr))
    }

    /// Distance to the nearest of this site's locations.
    pub fn distance_km(&self, from: &GeoLocation) -> Option<f64> {
        self.locations
            .iter()
            .map(|loc| loc.distance_km(from))
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn summary(&self) -> SiteSummary {
        SiteSummary {
            uuid: self.id,
            name: self.name.clone(),
            endpoint: self.endpoint.to_string(),
            locations: self.locations.clone(),
            local_networks: self.local_networks.iter().map(ToString::to_string).collect(),
            accepted_clients: self
                .accepted_clients
                .iter()
                .map(ToString::to_string)
                .collect(),
            rejected_clients: self
                .rejected_clients
                .iter()
                .map(ToString::to_string)
                .collect(),
            resources: self.resources.clone(),
            last_update: self.last_update,
        }
    }
}

pub fn default_name(endpoint: &Url) -> String {
    endpoint.host_str().unwrap_or("cloudlet").to_string()
}

pub fn accept_all() -> Vec<IpNetwork> {
    vec![IpNetwork::any_v4(), IpNetwork::any_v6()]
}

/// Public view of a site, as listed by `GET /sites`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSummary {
    pub uuid: Uuid,
    pub name: String,
    pub endpoint: String,
    pub locations: Vec<GeoLocation>,
    pub local_networks: Vec<String>,
    pub accepted_clients: Vec<String>,
    pub rejected_clients: Vec<String>,
    pub resources: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_update: Option<DateTime<Utc>>,
}

/// A site as written in the static sites file. Missing fields get defaults
/// when the site is resolved.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SiteDescriptor {
    pub endpoint: Url,
    pub name: Option<String>,
    /// Primary location, listed before `locations`.
    pub location: Option<GeoLocation>,
    pub locations: Option<Vec<GeoLocation>>,
    pub local_networks: Option<Vec<IpNetwork>>,
    pub accepted_clients: Option<Vec<IpNetwork>>,
    pub rejected_clients: Option<Vec<IpNetwork>>,
    pub resources: Option<BTreeMap<String, f64>>,
}

/// Body of `POST /sites`, sent periodically by every site.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SiteRegistration {
    pub uuid: Uuid,
    pub endpoint: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GeoLocation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_networks: Option<Vec<IpNetwork>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_clients: Option<Vec<IpNetwork>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_clients: Option<Vec<IpNetwork>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<BTreeMap<String, f64>>,
}

/// Common shape of every site source before defaults are filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteDraft {
    pub id: Uuid,
    pub endpoint: Url,
    pub name: Option<String>,
    pub locations: Option<Vec<GeoLocation>>,
    pub local_networks: Option<Vec<IpNetwork>>,
    pub accepted_clients: Option<Vec<IpNetwork>>,
    pub rejected_clients: Option<Vec<IpNetwork>>,
    pub resources: Option<BTreeMap<String, f64>>,
    pub last_update: Option<DateTime<Utc>>,
}

impl SiteDescriptor {
    /// Static sites get a fresh identity and no timestamp.
    pub fn into_draft(self) -> SiteDraft {
        let locations = match (self.location, self.locations) {
            (None, None) => None,
            (primary, rest) => Some(primary.into_iter().chain(rest.unwrap_or_default()).collect()),
        };
        SiteDraft {
            id: Uuid::new_v4(),
            endpoint: self.endpoint,
            name: self.name,
            locations,
            local_networks: self.local_networks,
            accepted_clients: self.accepted_clients,
            rejected_clients: self.rejected_clients,
            resources: self.resources,
            last_update: None,
        }
    }
}

impl SiteRegistration {
    /// Registered sites are stamped with `now`; an omitted location list
    /// means "no known location" rather than "look it up".
    pub fn into_draft(self, now: DateTime<Utc>) -> SiteDraft {
        SiteDraft {
            id: self.uuid,
            endpoint: self.endpoint,
            name: self.name,
            locations: Some(self.locations.unwrap_or_default()),
            local_networks: self.local_networks,
            accepted_clients: self.accepted_clients,
            rejected_clients: self.rejected_clients,
            resources: self.resources,
            last_update: Some(now),
        }
    }
}

impl SiteDraft {
    /// True when the endpoint host has to be resolved to fill in defaults.
    pub fn needs_addresses(&self) -> bool {
        self.locations.is_none() || self.local_networks.is_none()
    }

    /// Fills the remaining defaults. `addresses` are the endpoint host's
    /// globally routable addresses and `located` their coordinates.
    pub fn finish(self, addresses: &[IpAddr], located: Vec<GeoLocation>) -> Site {
        Site {
            id: self.id,
            name: self.name.unwrap_or_else(|| default_name(&self.endpoint)),
            endpoint: self.endpoint,
            locations: self.locations.unwrap_or(located),
            local_networks: self
                .local_networks
                .unwrap_or_else(|| addresses.iter().copied().map(IpNetwork::host).collect()),
            accepted_clients: self.accepted_clients.unwrap_or_else(accept_all),
            rejected_clients: self.rejected_clients.unwrap_or_default(),
            resources: self.resources.unwrap_or_default(),
            last_update: self.last_update,
        }
    }
}

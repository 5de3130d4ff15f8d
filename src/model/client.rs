use std::net::IpAddr;

use crate::geo::GeoLocation;

use super::ClientKey;

/// What is known about the client behind a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientContext {
    pub key: ClientKey,
    pub address: IpAddr,
    pub location: Option<GeoLocation>,
}

impl ClientContext {
    pub fn new(key: ClientKey, address: IpAddr, location: Option<GeoLocation>) -> Self {
        Self {
            key,
            address,
            location,
        }
    }
}

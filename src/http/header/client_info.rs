//! Who is asking: address and coordinate of the client behind a request.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

use crate::dispatch::{HEADER_CLIENT_IP, HEADER_LOCATION};
use crate::geo::{GeoLocation, GeoLocator};

/// `X-ClientIP` when it holds an address, the peer address otherwise. A bad
/// header is logged and ignored; a request with no usable address is an error.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Result<IpAddr, String> {
    let from_header = headers.get(HEADER_CLIENT_IP).and_then(|value| {
        match value.to_str().ok().and_then(|raw| raw.trim().parse::<IpAddr>().ok()) {
            Some(addr) => Some(addr),
            None => {
                debug!(
                    component = "http",
                    event = "client_ip_ignored",
                    value = ?value,
                    "ignoring malformed client address"
                );
                None
            }
        }
    });
    from_header
        .or_else(|| peer.map(|addr| addr.ip()))
        .ok_or_else(|| "client address is unknown".to_string())
}

/// `X-Location` when it holds a valid `"lat,long"`, else whatever the locator
/// knows about `address`. Bad header values are dropped, never rejected.
pub fn client_location(
    headers: &HeaderMap,
    address: IpAddr,
    locator: &dyn GeoLocator,
) -> Option<GeoLocation> {
    let from_header = headers
        .get(HEADER_LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| match GeoLocation::parse_pair(raw) {
            Ok(location) => Some(location),
            Err(e) => {
                debug!(
                    component = "http",
                    event = "location_ignored",
                    error = %e,
                    "ignoring malformed client location"
                );
                None
            }
        });
    from_header.or_else(|| locator.locate(address))
}

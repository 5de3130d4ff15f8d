//! Geographic coordinates, great-circle distance and address geolocation.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::net::IpAddr;

use crate::net::IpNetwork;

/// Mean earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Speed of light in vacuum, km/s.
const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("latitude {0} out of bounds")]
    Latitude(f64),
    #[error("longitude {0} out of bounds")]
    Longitude(f64),
    #[error("malformed coordinate {0:?}")]
    Malformed(String),
}

/// A validated (latitude, longitude) pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoLocation {
    latitude: f64,
    longitude: f64,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Parses the `"lat,long"` form used by the `X-Location` header.
    pub fn parse_pair(raw: &str) -> Result<Self, GeoError> {
        let mut parts = raw.split(',');
        let (Some(lat), Some(lon), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(GeoError::Malformed(raw.to_string()));
        };
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| GeoError::Malformed(raw.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| GeoError::Malformed(raw.to_string()))?;
        Self::new(lat, lon)
    }

    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoLocation) -> f64 {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lat2 = other.latitude * DEG_TO_RAD;
        let delta_lat = (other.latitude - self.latitude) * DEG_TO_RAD;
        let delta_lon = (other.longitude - self.longitude) * DEG_TO_RAD;

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_RADIUS_KM * c
    }

    /// Renders the coordinate back into header form.
    pub fn to_header_value(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Lower bound for the round trip time to something `distance_km` away, in seconds.
pub fn estimated_rtt(distance_km: f64) -> f64 {
    2.0 * (distance_km / SPEED_OF_LIGHT_KM_S)
}

impl Serialize for GeoLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.latitude, self.longitude).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GeoLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (lat, lon) = <(f64, f64)>::deserialize(deserializer)?;
        GeoLocation::new(lat, lon).map_err(serde::de::Error::custom)
    }
}

/// Address to coordinate lookup. A miss is not an error.
pub trait GeoLocator: Send + Sync {
    fn locate(&self, addr: IpAddr) -> Option<GeoLocation>;
}

/// Locator that never knows where anything is.
#[derive(Debug, Default, Clone)]
pub struct NoopLocator;

impl GeoLocator for NoopLocator {
    fn locate(&self, _addr: IpAddr) -> Option<GeoLocation> {
        None
    }
}

/// Locator backed by a fixed network table; the longest matching prefix wins.
#[derive(Debug, Default, Clone)]
pub struct StaticLocator {
    table: Vec<(IpNetwork, GeoLocation)>,
}

impl StaticLocator {
    pub fn new(entries: impl IntoIterator<Item = (IpNetwork, GeoLocation)>) -> Self {
        let mut table: Vec<_> = entries.into_iter().collect();
        table.sort_by(|a, b| b.0.prefix_len().cmp(&a.0.prefix_len()));
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl GeoLocator for StaticLocator {
    fn locate(&self, addr: IpAddr) -> Option<GeoLocation> {
        self.table
            .iter()
            .find(|(network, _)| network.contains(addr))
            .map(|(_, location)| *location)
    }
}

//! IP network values and membership tests.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkParseError {
    #[error("invalid address in {0:?}")]
    Address(String),
    #[error("invalid prefix length in {0:?}")]
    Prefix(String),
}

/// An IPv4 or IPv6 network in CIDR form. Host bits are always cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpNetwork {
    V4 { addr: Ipv4Addr, prefix: u8 },
    V6 { addr: Ipv6Addr, prefix: u8 },
}

impl IpNetwork {
    /// Builds the network containing `addr`, masking off the host bits.
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self, NetworkParseError> {
        match addr {
            IpAddr::V4(v4) => {
                if prefix > 32 {
                    return Err(NetworkParseError::Prefix(format!("{addr}/{prefix}")));
                }
                let masked = u32::from(v4) & v4_mask(prefix);
                Ok(IpNetwork::V4 {
                    addr: Ipv4Addr::from(masked),
                    prefix,
                })
            }
            IpAddr::V6(v6) => {
                if prefix > 128 {
                    return Err(NetworkParseError::Prefix(format!("{addr}/{prefix}")));
                }
                let masked = u128::from(v6) & v6_mask(prefix);
                Ok(IpNetwork::V6 {
                    addr: Ipv6Addr::from(masked),
                    prefix,
                })
            }
        }
    }

    /// Single-host network for `addr`.
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => IpNetwork::V4 { addr, prefix: 32 },
            IpAddr::V6(addr) => IpNetwork::V6 { addr, prefix: 128 },
        }
    }

    /// Every IPv4 address.
    pub fn any_v4() -> Self {
        IpNetwork::V4 {
            addr: Ipv4Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    /// Every IPv6 address.
    pub fn any_v6() -> Self {
        IpNetwork::V6 {
            addr: Ipv6Addr::UNSPECIFIED,
            prefix: 0,
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            IpNetwork::V4 { prefix, .. } | IpNetwork::V6 { prefix, .. } => *prefix,
        }
    }

    pub fn network_addr(&self) -> IpAddr {
        match self {
            IpNetwork::V4 { addr, .. } => IpAddr::V4(*addr),
            IpNetwork::V6 { addr, .. } => IpAddr::V6(*addr),
        }
    }

    /// Membership test; addresses of the other family never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self, ip) {
            (IpNetwork::V4 { addr, prefix }, IpAddr::V4(ip)) => {
                u32::from(ip) & v4_mask(*prefix) == u32::from(*addr)
            }
            (IpNetwork::V6 { addr, prefix }, IpAddr::V6(ip)) => {
                u128::from(ip) & v6_mask(*prefix) == u128::from(*addr)
            }
            _ => false,
        }
    }

    /// Number of usable IPv4 host addresses (network and broadcast excluded
    /// unless the network is a /31 or /32). IPv6 networks have none here.
    pub fn host_count(&self) -> u64 {
        match self {
            IpNetwork::V4 { prefix, .. } => match *prefix {
                32 => 1,
                31 => 2,
                p => (1u64 << (32 - p)) - 2,
            },
            IpNetwork::V6 { .. } => 0,
        }
    }

    /// The `index`-th usable IPv4 host address, counting from zero.
    pub fn nth_host(&self, index: u64) -> Option<Ipv4Addr> {
        let IpNetwork::V4 { addr, prefix } = self else {
            return None;
        };
        if index >= self.host_count() {
            return None;
        }
        let base = u32::from(*addr) as u64;
        let offset = if *prefix >= 31 { index } else { index + 1 };
        Some(Ipv4Addr::from((base + offset) as u32))
    }
}

fn v4_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix as u32)
    }
}

fn v6_mask(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - prefix as u32)
    }
}

impl FromStr for IpNetwork {
    type Err = NetworkParseError;

    /// Accepts `addr/prefix` or a bare address (host network).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr
                    .parse()
                    .map_err(|_| NetworkParseError::Address(s.to_string()))?;
                let prefix: u8 = prefix
                    .parse()
                    .map_err(|_| NetworkParseError::Prefix(s.to_string()))?;
                IpNetwork::new(addr, prefix)
            }
            None => {
                let addr: IpAddr = s
                    .parse()
                    .map_err(|_| NetworkParseError::Address(s.to_string()))?;
                Ok(IpNetwork::host(addr))
            }
        }
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpNetwork::V4 { addr, prefix } => write!(f, "{addr}/{prefix}"),
            IpNetwork::V6 { addr, prefix } => write!(f, "{addr}/{prefix}"),
        }
    }
}

impl Serialize for IpNetwork {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IpNetwork {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// True when the address is publicly routable.
pub fn is_global(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // shared address space, 100.64.0.0/10
                || (octets[0] == 100 && (octets[1] & 0xc0) == 64)
                || octets[0] == 0
                || octets[0] >= 240)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || (first == 0x2001 && v6.segments()[1] == 0x0db8))
        }
    }
}

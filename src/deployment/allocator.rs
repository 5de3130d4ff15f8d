//! Client tunnel address allocation.

use rand::seq::index;
use rand::Rng;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

use crate::cluster::peer::LABEL_CLIENT;
use crate::cluster::{ControlPlane, LabelSelector};
use crate::net::IpNetwork;

use super::DeployError;

/// Addresses probed per round.
pub const PROBES_PER_ROUND: usize = 32;
const MAX_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct AddressAllocator {
    network: IpNetwork,
}

impl AddressAllocator {
    pub fn new(network: IpNetwork) -> Self {
        Self { network }
    }

    pub fn network(&self) -> IpNetwork {
        self.network
    }

    /// Finds an address no managed peer claims. Each round reads the claimed
    /// set once and probes a fresh random sample of the host range.
    pub async fn allocate(&self, control_plane: &dyn ControlPlane) -> Result<Ipv4Addr, DeployError> {
        for round in 1..=MAX_ROUNDS {
            let used = claimed_addresses(control_plane).await?;
            let picked = pick_address(self.network, &used, &mut rand::thread_rng());
            if let Some(addr) = picked {
                return Ok(addr);
            }
            debug!(
                component = "allocator",
                event = "round_exhausted",
                round,
                claimed = used.len(),
                "no free address in sample, resampling"
            );
        }
        Err(DeployError::AddressesExhausted(self.network))
    }
}

async fn claimed_addresses(control_plane: &dyn ControlPlane) -> Result<HashSet<Ipv4Addr>, DeployError> {
    let peers = control_plane.list_peers(&LabelSelector::managed()).await?;
    Ok(peers
        .iter()
        .filter_map(|p| p.labels.get(LABEL_CLIENT)?.parse().ok())
        .collect())
}

/// Samples up to [`PROBES_PER_ROUND`] distinct hosts of `network` and returns
/// the first one not in `used`.
pub fn pick_address<R: Rng + ?Sized>(
    network: IpNetwork,
    used: &HashSet<Ipv4Addr>,
    rng: &mut R,
) -> Option<Ipv4Addr> {
    let hosts = usize::try_from(network.host_count()).ok()?;
    if hosts == 0 {
        return None;
    }
    index::sample(rng, hosts, PROBES_PER_ROUND.min(hosts))
        .into_iter()
        .filter_map(|i| network.nth_host(i as u64))
        .find(|addr| !used.contains(addr) && network.contains(IpAddr::V4(*addr)))
}

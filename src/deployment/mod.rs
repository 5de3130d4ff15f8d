// Per-site instance lifecycle on top of the cluster control plane.

pub mod allocator;
pub mod manager;

pub use allocator::{pick_address, AddressAllocator, PROBES_PER_ROUND};
pub use manager::{instance_name, DeployError, DeploymentManager, DEFAULT_CREATE_ATTEMPTS};

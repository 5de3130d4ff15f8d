// Site-local gateway to the cluster control plane and its metrics backend.

pub mod control_plane;
pub mod kube;
pub mod peer;
pub mod prometheus;

pub use control_plane::{ControlPlane, ControlPlaneError};
pub use kube::{KubeControlPlane, KubeTarget};
pub use peer::{LabelSelector, PeerResource};
pub use prometheus::{MetricsSource, PrometheusSource, RESOURCE_QUERIES};

#[cfg(test)]
mod cluster_test;

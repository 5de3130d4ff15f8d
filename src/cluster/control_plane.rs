use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::SiteTunnel;

use super::peer::{LabelSelector, PeerResource};

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("resource {0} already exists")]
    AlreadyExists(String),
    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed control plane output: {0}")]
    Malformed(String),
    #[error("control plane unavailable")]
    Unavailable,
}

/// Operations the site needs from its cluster.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Creates the peer, failing with `AlreadyExists` when the name is taken.
    async fn create_peer(&self, peer: &PeerResource) -> Result<(), ControlPlaneError>;

    async fn list_peers(&self, selector: &LabelSelector)
        -> Result<Vec<PeerResource>, ControlPlaneError>;

    /// Deletes the peer. A missing peer is not an error.
    async fn delete_peer(&self, name: &str) -> Result<(), ControlPlaneError>;

    /// Installs or upgrades release `name` into namespace `name`.
    async fn install_release(
        &self,
        name: &str,
        chart_ref: &str,
        values: &Map<String, Value>,
    ) -> Result<(), ControlPlaneError>;

    /// Removes the release and its namespace. Missing ones are not an error.
    async fn uninstall_release(&self, name: &str) -> Result<(), ControlPlaneError>;

    fn tunnel(&self) -> &SiteTunnel;
}

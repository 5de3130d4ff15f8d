//! Maps (workload, client key) to exactly one running instance.
//!
//! The control plane is the only source of truth. Creation applies a peer,
//! re-reads every peer carrying the same identity labels and keeps the oldest
//! one; losers remove what they applied and adopt the survivor. Address
//! clashes between different identities are settled the same way.
//!
//! Instance names are derived from the pair. When a peer of another identity
//! already holds the name, the next attempt derives a salted one.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cluster::peer::LABEL_CLIENT;
use crate::cluster::{ControlPlane, ControlPlaneError, LabelSelector, PeerResource};
use crate::metrics;
use crate::model::{
    ClientKey, Instance, InstanceInfo, InstanceRecord, InstanceStatus, Recipe, RecipeError,
};
use crate::naming::human_name;
use crate::net::IpNetwork;
use crate::repository::Repository;

use super::AddressAllocator;

pub const DEFAULT_CREATE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("recipe {0} not found")]
    RecipeNotFound(Uuid),
    #[error("no free client address in {0}")]
    AddressesExhausted(IpNetwork),
    #[error("instance creation did not settle after {0} attempts")]
    Contention(usize),
    #[error("control plane: {0}")]
    ControlPlane(#[from] ControlPlaneError),
}

pub struct DeploymentManager {
    control_plane: Arc<dyn ControlPlane>,
    repository: Repository,
    allocator: AddressAllocator,
    create_attempts: usize,
}

enum Settled {
    Ready(InstanceRecord),
    Retry,
    NameTaken,
}

/// Name of the instance for `(workload, key)`. Salt 0 is the plain name,
/// later salts are fallbacks for names held by other identities.
pub fn instance_name(workload: Uuid, key: &ClientKey, salt: u8) -> String {
    match salt {
        0 => human_name(&[workload.as_bytes(), key.as_bytes()]),
        n => human_name(&[workload.as_bytes(), key.as_bytes(), &[n]]),
    }
}

impl DeploymentManager {
    pub fn new(
        control_plane: Arc<dyn ControlPlane>,
        repository: Repository,
        client_network: IpNetwork,
        create_attempts: usize,
    ) -> Self {
        Self {
            control_plane,
            repository,
            allocator: AddressAllocator::new(client_network),
            create_attempts: create_attempts.max(1),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// The surviving instance for the pair, if any.
    pub async fn resolve(
        &self,
        workload: Uuid,
        key: &ClientKey,
    ) -> Result<Option<InstanceRecord>, DeployError> {
        self.survivor(&LabelSelector::instance(workload, key)).await
    }

    /// Returns the existing instance or creates it, then makes sure its
    /// release is installed.
    pub async fn create_or_get(&self, workload: Uuid, key: ClientKey) -> Result<Instance, DeployError> {
        let recipe = self.load_recipe(workload).await?;
        let chart_ref = self.repository.chart_ref(&recipe).map_err(|e| {
            warn!(component = "deployment", event = "chart_ref_rejected", workload = %workload, error = %e);
            DeployError::RecipeNotFound(workload)
        })?;
        let mut salt = 0u8;

        for attempt in 1..=self.create_attempts {
            let name = instance_name(workload, &key, salt);
            let record = match self.settle(workload, key, &name, &recipe).await? {
                Settled::Ready(record) => record,
                Settled::NameTaken => {
                    warn!(
                        component = "deployment",
                        event = "name_taken",
                        instance = %name,
                        workload = %workload,
                        attempt,
                        "instance name held by another identity"
                    );
                    salt = salt.wrapping_add(1);
                    continue;
                }
                Settled::Retry => {
                    metrics::inc_create_conflicts();
                    info!(
                        component = "deployment",
                        event = "create_retry",
                        workload = %workload,
                        attempt,
                        "instance creation raced, resolving again"
                    );
                    continue;
                }
            };

            self.control_plane
                .install_release(&record.name, chart_ref.as_str(), &recipe.values)
                .await?;
            return Ok(Instance { record, recipe });
        }

        warn!(
            component = "deployment",
            event = "create_contention",
            workload = %workload,
            attempts = self.create_attempts,
            "instance creation did not settle"
        );
        Err(DeployError::Contention(self.create_attempts))
    }

    async fn settle(
        &self,
        workload: Uuid,
        key: ClientKey,
        name: &str,
        recipe: &Recipe,
    ) -> Result<Settled, DeployError> {
        let selector = LabelSelector::instance(workload, &key);
        if let Some(existing) = self.survivor(&selector).await? {
            return Ok(Settled::Ready(existing));
        }

        let client_ip = self.allocator.allocate(self.control_plane.as_ref()).await?;
        let peer = PeerResource::for_instance(
            name,
            workload,
            key,
            client_ip,
            &recipe.chart_version(),
            Utc::now(),
        );
        let mine = peer
            .record()
            .ok_or_else(|| ControlPlaneError::Malformed(format!("peer {} has no identity", name)))?;

        match self.control_plane.create_peer(&peer).await {
            Ok(()) => {}
            Err(ControlPlaneError::AlreadyExists(_)) => {
                // only a holder of another identity needs a different name
                return Ok(match self.survivor(&selector).await? {
                    Some(_) => Settled::Retry,
                    None => Settled::NameTaken,
                });
            }
            Err(e) => return Err(e.into()),
        }

        let survivor = self.survivor(&selector).await?.unwrap_or_else(|| mine.clone());
        if survivor.name != mine.name {
            self.withdraw(&mine).await;
            return Ok(Settled::Ready(survivor));
        }

        let holders = self
            .records(&LabelSelector::managed().with(LABEL_CLIENT, &client_ip.to_string()))
            .await?;
        if holders.iter().any(|other| other.name != mine.name && other.precedes(&mine)) {
            self.withdraw(&mine).await;
            return Ok(Settled::Retry);
        }

        metrics::inc_instances_created();
        info!(
            component = "deployment",
            event = "instance_created",
            instance = %mine.name,
            workload = %workload,
            client_ip = %client_ip,
            "instance created"
        );
        Ok(Settled::Ready(mine))
    }

    /// Removes the instance's release and namespace, then its peer. The peer
    /// is what sweeps enumerate, so it is only deleted once the release is
    /// gone; on failure everything is left for the next sweep.
    pub async fn expire(&self, record: &InstanceRecord) -> Result<(), DeployError> {
        if let Err(e) = self.control_plane.uninstall_release(&record.name).await {
            warn!(component = "deployment", event = "uninstall_failed", instance = %record.name, error = %e);
            return Err(e.into());
        }
        if let Err(e) = self.control_plane.delete_peer(&record.name).await {
            warn!(component = "deployment", event = "delete_peer_failed", instance = %record.name, error = %e);
            return Err(e.into());
        }
        metrics::inc_instances_expired();
        info!(component = "deployment", event = "instance_expired", instance = %record.name, "instance expired");
        Ok(())
    }

    /// Fresh read of whether the instance's peer still exists.
    pub async fn status(&self, record: &InstanceRecord) -> InstanceStatus {
        match self
            .control_plane
            .list_peers(&LabelSelector::instance(record.workload, &record.key))
            .await
        {
            Ok(peers) if peers.iter().any(|p| p.name == record.name) => InstanceStatus::Deployed,
            Ok(_) => InstanceStatus::Expired,
            Err(e) => {
                warn!(component = "deployment", event = "status_failed", instance = %record.name, error = %e);
                InstanceStatus::Expired
            }
        }
    }

    pub async fn info(&self, record: &InstanceRecord) -> InstanceInfo {
        let status = self.status(record).await;
        InstanceInfo::new(record, status, self.control_plane.tunnel())
    }

    /// Every instance this site manages.
    pub async fn instances(&self) -> Result<Vec<InstanceRecord>, DeployError> {
        self.records(&LabelSelector::managed()).await
    }

    async fn load_recipe(&self, workload: Uuid) -> Result<Recipe, DeployError> {
        self.repository.recipe(workload).await.map_err(|e: RecipeError| {
            warn!(component = "deployment", event = "recipe_unavailable", workload = %workload, error = %e);
            DeployError::RecipeNotFound(workload)
        })
    }

    async fn records(&self, selector: &LabelSelector) -> Result<Vec<InstanceRecord>, DeployError> {
        let peers = self.control_plane.list_peers(selector).await?;
        Ok(peers.iter().filter_map(PeerResource::record).collect())
    }

    async fn survivor(&self, selector: &LabelSelector) -> Result<Option<InstanceRecord>, DeployError> {
        let records = self.records(selector).await?;
        Ok(records
            .into_iter()
            .reduce(|best, next| if next.precedes(&best) { next } else { best }))
    }

    async fn withdraw(&self, mine: &InstanceRecord) {
        if let Err(e) = self.control_plane.delete_peer(&mine.name).await {
            warn!(component = "deployment", event = "withdraw_failed", instance = %mine.name, error = %e);
        }
    }
}

//! Primary plus fallback resolution against the ring cache.

use std::sync::Arc;

use corelib::{Error, Instance, RingCache, Selector};
use tracing::debug;

use crate::error::Result;
use crate::strategy::ReplicationStrategy;

/// Where a key lives right now: its owner and the ordered fallbacks to try
/// when the owner cannot serve.
#[derive(Debug, Clone)]
pub struct ReplicaPlacement {
    pub primary: Arc<Instance>,
    pub fallbacks: Vec<Arc<Instance>>,
    /// Revision of the ring the placement was computed from.
    pub revision: u64,
}

impl ReplicaPlacement {
    /// Resolve `key` in `cluster` using one consistent view of the ring.
    ///
    /// The primary is the instance [`Selector::select`] returns for the same
    /// ring; fallbacks come from `strategy` and never repeat the primary.
    pub fn resolve<S>(cache: &RingCache, strategy: &S, cluster: &str, key: &[u8]) -> Result<Self>
    where
        S: ReplicationStrategy + ?Sized,
    {
        let ring = cache
            .get(cluster)
            .ok_or_else(|| Error::UnknownCluster(cluster.to_string()))?;
        let primary = Selector::select_in(&ring, key)?;

        let fallbacks: Vec<Arc<Instance>> = strategy
            .replicas_for_key(&ring, key)
            .into_iter()
            .filter(|inst| inst.id() != primary.id())
            .take(strategy.replication_factor().saturating_sub(1))
            .collect();

        debug!(
            cluster,
            revision = ring.revision(),
            strategy = strategy.name(),
            primary = %primary.id(),
            fallbacks = fallbacks.len(),
            "resolved replicas"
        );
        Ok(Self {
            primary,
            fallbacks,
            revision: ring.revision(),
        })
    }

    /// Primary followed by fallbacks.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Instance>> {
        std::iter::once(&self.primary).chain(&self.fallbacks)
    }
}

//! Per-cluster ring publication.
//!
//! # Data Flow
//! ```text
//! discovery refresh (external)
//!     → Snapshot (validated, immutable)
//!     → RingCache::publish
//!         → revision check against the published ring
//!         → RingBuilder::build (off the read path)
//!         → atomic swap of Arc<HashRing>
//!     → Selector reads whichever ring is current
//! ```
//!
//! Readers never take the writer lock. A selection holds its own `Arc` to the
//! ring it started with, so a concurrent swap never changes a lookup midway
//! and the old ring is freed once its last reader is done.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::cluster::ClusterId;
use crate::config::{RingConfig, StalenessPolicy};
use crate::error::{Error, Result};
use crate::instance::{Instance, InstanceRecord};
use crate::ring::{HashRing, RingBuilder};
use crate::snapshot::Snapshot;

/// Result of offering a snapshot to the cache.
///
/// Only `Installed` changes what selectors observe. `Stale` and `Superseded`
/// are expected outcomes of out-of-order or duplicated discovery pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A ring built from this revision is now current.
    Installed { revision: u64, vnodes: usize },
    /// The published ring is already at `current`, which this revision does not beat.
    Stale { revision: u64, current: u64 },
    /// A newer revision was offered while this one waited to be built.
    Superseded { revision: u64, newer: u64 },
}

impl PublishOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, PublishOutcome::Installed { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            PublishOutcome::Installed { .. } => "installed",
            PublishOutcome::Stale { .. } => "stale",
            PublishOutcome::Superseded { .. } => "superseded",
        }
    }
}

#[derive(Debug, Default)]
struct ClusterSlot {
    ring: ArcSwapOption<HashRing>,
    // Highest revision any publisher has offered, built or not.
    highest_offered: AtomicU64,
    // Serializes rebuilds for this cluster.
    publish_lock: Mutex<()>,
}

impl ClusterSlot {
    fn current_revision(&self) -> Option<u64> {
        self.ring.load_full().map(|ring| ring.revision())
    }
}

/// Owns the cluster → current ring mapping.
#[derive(Debug)]
pub struct RingCache {
    builder: RingBuilder,
    staleness: StalenessPolicy,
    clusters: DashMap<ClusterId, Arc<ClusterSlot>>,
}

impl Default for RingCache {
    fn default() -> Self {
        Self::new(RingBuilder::default())
    }
}

impl RingCache {
    pub fn new(builder: RingBuilder) -> Self {
        Self {
            builder,
            staleness: StalenessPolicy::default(),
            clusters: DashMap::new(),
        }
    }

    /// Validate `config` and build a cache from it.
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        Ok(Self::new(RingBuilder::from_config(config)?).with_staleness(config.staleness))
    }

    pub fn with_staleness(mut self, staleness: StalenessPolicy) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn builder(&self) -> &RingBuilder {
        &self.builder
    }

    /// Offer a snapshot. Rebuilds and swaps the cluster's ring unless the
    /// revision is stale or a newer one is already waiting.
    pub fn publish(&self, snapshot: Snapshot) -> PublishOutcome {
        let cluster = snapshot.cluster().clone();
        let revision = snapshot.revision();
        let slot = self.slot(&cluster);

        slot.highest_offered.fetch_max(revision, Ordering::AcqRel);
        let outcome = {
            let _guard = slot.publish_lock.lock();
            match slot.current_revision() {
                Some(current) if !self.staleness.accepts(current, revision) => {
                    PublishOutcome::Stale { revision, current }
                }
                _ => {
                    let newer = slot.highest_offered.load(Ordering::Acquire);
                    if newer > revision {
                        PublishOutcome::Superseded { revision, newer }
                    } else {
                        let started = Instant::now();
                        let ring = Arc::new(self.builder.build(&snapshot));
                        let vnodes = ring.token_count();
                        slot.ring.store(Some(ring));
                        metrics::histogram!("ringlb_ring_build_seconds")
                            .record(started.elapsed().as_secs_f64());
                        PublishOutcome::Installed { revision, vnodes }
                    }
                }
            }
        };

        metrics::counter!("ringlb_publish_total", "outcome" => outcome.label()).increment(1);
        match outcome {
            PublishOutcome::Installed { vnodes, .. } => {
                info!(%cluster, revision, vnodes, instances = snapshot.len(), "installed ring");
            }
            PublishOutcome::Stale { current, .. } => {
                debug!(%cluster, revision, current, "ignored stale snapshot");
            }
            PublishOutcome::Superseded { newer, .. } => {
                debug!(%cluster, revision, newer, "skipped superseded snapshot");
            }
        }
        outcome
    }

    /// Inbound discovery hook: build the snapshot and publish it.
    ///
    /// Safe to call with stale or duplicate revisions. An invalid instance
    /// list is logged and returned as [`Error::InvalidSnapshot`](crate::Error::InvalidSnapshot).
    pub fn on_instances_updated(
        &self,
        cluster: impl Into<ClusterId>,
        revision: u64,
        instances: Vec<Instance>,
    ) -> Result<PublishOutcome> {
        let snapshot = Snapshot::new(cluster, revision, instances).map_err(rejected)?;
        Ok(self.publish(snapshot))
    }

    /// Like [`on_instances_updated`](Self::on_instances_updated) for wire records.
    pub fn on_records_updated(
        &self,
        cluster: impl Into<ClusterId>,
        revision: u64,
        records: Vec<InstanceRecord>,
    ) -> Result<PublishOutcome> {
        let snapshot = Snapshot::from_records(cluster, revision, records).map_err(rejected)?;
        Ok(self.publish(snapshot))
    }

    /// Current ring for `cluster`, or `None` if it was never populated.
    pub fn get(&self, cluster: &str) -> Option<Arc<HashRing>> {
        let slot = self.clusters.get(cluster).map(|entry| Arc::clone(entry.value()))?;
        slot.ring.load_full()
    }

    /// Revision of the current ring for `cluster`.
    pub fn revision(&self, cluster: &str) -> Option<u64> {
        self.get(cluster).map(|ring| ring.revision())
    }

    /// Clusters with a published ring.
    pub fn clusters(&self) -> Vec<ClusterId> {
        let mut ids: Vec<ClusterId> = self
            .clusters
            .iter()
            .filter(|entry| entry.value().ring.load().is_some())
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clusters().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget a cluster removed by configuration. A later snapshot for the
    /// same id starts again from the unknown state.
    pub fn drop_cluster(&self, cluster: &str) -> bool {
        let removed = self.clusters.remove(cluster).is_some();
        if removed {
            info!(%cluster, "dropped cluster");
        }
        removed
    }

    fn slot(&self, cluster: &ClusterId) -> Arc<ClusterSlot> {
        if let Some(slot) = self.clusters.get(cluster.as_str()) {
            return Arc::clone(slot.value());
        }
        Arc::clone(self.clusters.entry(cluster.clone()).or_default().value())
    }
}

fn rejected(err: Error) -> Error {
    metrics::counter!("ringlb_publish_total", "outcome" => "rejected").increment(1);
    error!(error = %err, "rejected instance update");
    err
}

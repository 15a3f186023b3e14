//! Immutable, revisioned view of one cluster's instances.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cluster::ClusterId;
use crate::error::{Error, Result};
use crate::instance::{Instance, InstanceRecord};

/// The full instance list of a cluster at one revision.
///
/// # Invariants
///
/// - Instance ids are unique; duplicates are rejected, never deduplicated.
/// - `total_weight` is the sum of the weights of healthy instances, computed
///   once at construction.
/// - Instance order is kept as given. It carries no meaning for selection but
///   makes ring builds reproducible.
#[derive(Debug, Clone)]
pub struct Snapshot {
    cluster: ClusterId,
    revision: u64,
    instances: Arc<[Arc<Instance>]>,
    index: Arc<HashMap<String, usize>>,
    total_weight: u64,
}

impl Snapshot {
    /// Build a snapshot, rejecting duplicate instance ids.
    pub fn new(
        cluster: impl Into<ClusterId>,
        revision: u64,
        instances: Vec<Instance>,
    ) -> Result<Self> {
        let cluster = cluster.into();
        let mut index = HashMap::with_capacity(instances.len());
        let mut total_weight = 0u64;

        for (pos, instance) in instances.iter().enumerate() {
            if instance.id().as_str().is_empty() {
                return Err(invalid(&cluster, revision, "instance id must not be empty".into()));
            }
            if index.insert(instance.id().to_string(), pos).is_some() {
                return Err(invalid(
                    &cluster,
                    revision,
                    format!("duplicate instance id `{}`", instance.id()),
                ));
            }
            if instance.is_healthy() {
                total_weight += u64::from(instance.weight());
            }
        }

        Ok(Self {
            cluster,
            revision,
            instances: instances.into_iter().map(Arc::new).collect(),
            index: Arc::new(index),
            total_weight,
        })
    }

    /// Build a snapshot from wire records, rejecting negative weights.
    pub fn from_records(
        cluster: impl Into<ClusterId>,
        revision: u64,
        records: Vec<InstanceRecord>,
    ) -> Result<Self> {
        let cluster = cluster.into();
        let instances = records
            .into_iter()
            .map(InstanceRecord::into_instance)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| invalid(&cluster, revision, reason))?;
        Self::new(cluster, revision, instances)
    }

    /// A snapshot with no instances ("cluster temporarily empty").
    pub fn empty(cluster: impl Into<ClusterId>, revision: u64) -> Self {
        Self {
            cluster: cluster.into(),
            revision,
            instances: Arc::from(Vec::new()),
            index: Arc::default(),
            total_weight: 0,
        }
    }

    pub fn cluster(&self) -> &ClusterId {
        &self.cluster
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Instance>> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Sum of the weights of healthy instances.
    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn healthy_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_healthy()).count()
    }

    /// Instances that will receive ring entries.
    pub fn selectable(&self) -> impl Iterator<Item = &Arc<Instance>> {
        self.instances.iter().filter(|i| i.is_selectable())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Instance>> {
        self.index.get(id).map(|&pos| &self.instances[pos])
    }

    pub fn weight_of(&self, id: &str) -> Option<u32> {
        self.get(id).map(|i| i.weight())
    }
}

fn invalid(cluster: &ClusterId, revision: u64, reason: String) -> Error {
    Error::InvalidSnapshot {
        cluster: cluster.to_string(),
        revision,
        reason,
    }
}

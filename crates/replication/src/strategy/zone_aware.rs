//! Zone-aware replication strategy.
//!
//! Walks the ring like [`SimpleStrategy`](super::SimpleStrategy) but first
//! takes instances whose zone label has not been used yet. When there are
//! fewer zones than the replication factor, the remaining slots are filled
//! with the skipped instances in ring order.

use std::collections::HashSet;
use std::sync::Arc;

use corelib::ring::HashRing;
use corelib::Instance;

use crate::error::{ReplicationError, Result};
use crate::strategy::ReplicationStrategy;

/// Instances without the label all count as one unlabeled zone.
#[derive(Debug, Clone)]
pub struct ZoneAwareStrategy {
    replication_factor: usize,
    label: String,
}

impl ZoneAwareStrategy {
    /// Spread up to `replication_factor` instances across values of the
    /// `label` metadata key (e.g. `"zone"`).
    pub fn new(replication_factor: usize, label: impl Into<String>) -> Result<Self> {
        if replication_factor == 0 {
            return Err(ReplicationError::InvalidFactor(replication_factor));
        }
        Ok(Self {
            replication_factor,
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl ReplicationStrategy for ZoneAwareStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replicas_for_key(&self, ring: &HashRing, key: &[u8]) -> Vec<Arc<Instance>> {
        let mut chosen = Vec::with_capacity(self.replication_factor);
        let mut skipped = Vec::new();
        let mut zones = HashSet::new();

        for instance in ring.successors(key) {
            if chosen.len() == self.replication_factor {
                break;
            }
            let zone = instance.metadata_value(&self.label).unwrap_or_default();
            if zones.insert(zone) {
                chosen.push(Arc::clone(instance));
            } else {
                skipped.push(instance);
            }
        }

        let missing = self.replication_factor - chosen.len();
        chosen.extend(skipped.into_iter().take(missing).cloned());
        chosen
    }

    fn name(&self) -> &'static str {
        "ZoneAwareStrategy"
    }
}

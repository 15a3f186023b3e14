//! Simple replication strategy.
//!
//! Takes the owner of the key, then keeps walking clockwise and collects the
//! next N-1 instances not already chosen.
//!
//! # Limitations
//!
//! - Ignores zones and racks
//! - Heavily weighted instances own long runs of vnodes, so fallbacks for
//!   their keys skew toward whichever instance follows those runs

use std::sync::Arc;

use corelib::ring::HashRing;
use corelib::Instance;

use crate::error::{ReplicationError, Result};
use crate::strategy::ReplicationStrategy;

/// The owner followed by the next distinct instances clockwise.
///
/// # Example
///
/// ```rust
/// use corelib::{Instance, RingBuilder, Snapshot};
/// use replication::{ReplicationStrategy, SimpleStrategy};
///
/// let snapshot = Snapshot::new(
///     "orders",
///     1,
///     vec![
///         Instance::new("a", "10.0.0.1", 8080, 100),
///         Instance::new("b", "10.0.0.2", 8080, 100),
///         Instance::new("c", "10.0.0.3", 8080, 100),
///     ],
/// )
/// .unwrap();
/// let ring = RingBuilder::new().build(&snapshot);
///
/// let strategy = SimpleStrategy::new(2).unwrap();
/// let replicas = strategy.replicas_for_key(&ring, b"my-key");
/// assert_eq!(replicas.len(), 2);
/// assert_eq!(replicas[0].id(), ring.lookup(b"my-key").unwrap().id());
/// ```
#[derive(Debug, Clone)]
pub struct SimpleStrategy {
    /// Number of instances returned (including the owner).
    replication_factor: usize,
}

impl SimpleStrategy {
    /// Create a strategy returning up to `replication_factor` instances.
    ///
    /// # Errors
    /// [`ReplicationError::InvalidFactor`] when `replication_factor` is 0.
    pub fn new(replication_factor: usize) -> Result<Self> {
        if replication_factor == 0 {
            return Err(ReplicationError::InvalidFactor(replication_factor));
        }
        Ok(Self { replication_factor })
    }
}

impl Default for SimpleStrategy {
    /// Owner plus two fallbacks.
    fn default() -> Self {
        Self {
            replication_factor: 3,
        }
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn replicas_for_key(&self, ring: &HashRing, key: &[u8]) -> Vec<Arc<Instance>> {
        ring.successors(key)
            .take(self.replication_factor)
            .cloned()
            .collect()
    }

    fn name(&self) -> &'static str {
        "SimpleStrategy"
    }
}

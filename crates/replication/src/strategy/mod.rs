//! Replication strategy abstractions.
//!
//! A strategy decides how many instances a lookup returns and in what
//! order. Different strategies optimize for different goals:
//!
//! - **SimpleStrategy**: the owner plus the next distinct instances clockwise
//! - **ZoneAwareStrategy**: the same walk, preferring instances in zones not
//!   yet used

pub mod simple;
pub mod zone_aware;

use std::sync::Arc;

use corelib::ring::HashRing;
use corelib::Instance;

pub use simple::SimpleStrategy;
pub use zone_aware::ZoneAwareStrategy;

/// Trait for replication strategies.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (Send + Sync) as they are shared
/// between request handlers.
pub trait ReplicationStrategy: Send + Sync + 'static {
    /// Number of instances this strategy returns, at most.
    fn replication_factor(&self) -> usize;

    /// Instances for `key`, owner first, without duplicates.
    ///
    /// Returns fewer than [`replication_factor`](Self::replication_factor)
    /// instances when the ring has fewer, and none for an empty ring.
    ///
    /// # Performance
    /// O(log n + v) where n = vnodes and v = vnodes walked until enough
    /// distinct instances are found
    fn replicas_for_key(&self, ring: &HashRing, key: &[u8]) -> Vec<Arc<Instance>>;

    /// Strategy name (for logging/debugging).
    fn name(&self) -> &'static str;
}

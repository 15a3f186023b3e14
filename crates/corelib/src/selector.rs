//! Key → instance resolution.

use std::sync::Arc;

use tracing::trace;

use crate::cache::RingCache;
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::ring::HashRing;

/// Resolves `(cluster, routing key)` pairs against the current rings.
///
/// Selection issues no I/O and takes no lock beyond the cache's read of the
/// ring reference. Cloning a `Selector` is cheap; all clones share the cache.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use corelib::{Instance, RingCache, Selector};
///
/// let cache = Arc::new(RingCache::default());
/// cache
///     .on_instances_updated("orders", 1, vec![Instance::new("a", "10.0.0.1", 8080, 100)])
///     .unwrap();
///
/// let selector = Selector::new(cache);
/// let instance = selector.select("orders", b"user-42").unwrap();
/// assert_eq!(instance.id().as_str(), "a");
/// ```
#[derive(Debug, Clone)]
pub struct Selector {
    cache: Arc<RingCache>,
}

impl Selector {
    pub fn new(cache: Arc<RingCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<RingCache> {
        &self.cache
    }

    /// Select the instance responsible for `key` in `cluster`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownCluster`] if no snapshot was ever published
    /// - [`Error::NoAvailableInstance`] if the ring has no entries
    pub fn select(&self, cluster: &str, key: &[u8]) -> Result<Arc<Instance>> {
        let Some(ring) = self.cache.get(cluster) else {
            metrics::counter!("ringlb_select_total", "outcome" => "unknown_cluster").increment(1);
            return Err(Error::UnknownCluster(cluster.to_string()));
        };
        Self::select_in(&ring, key)
    }

    /// Select against a ring the caller already holds.
    pub fn select_in(ring: &HashRing, key: &[u8]) -> Result<Arc<Instance>> {
        let Some(owner) = ring.owner_of(key) else {
            metrics::counter!("ringlb_select_total", "outcome" => "no_instance").increment(1);
            return Err(Error::NoAvailableInstance(ring.cluster().to_string()));
        };
        ring.record_hit(owner);
        metrics::counter!("ringlb_select_total", "outcome" => "selected").increment(1);

        let instance = ring
            .instance(owner)
            .cloned()
            .ok_or_else(|| Error::NoAvailableInstance(ring.cluster().to_string()))?;
        trace!(cluster = %ring.cluster(), revision = ring.revision(), instance = %instance.id(), "selected instance");
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_cluster() {
        let selector = Selector::new(Arc::new(RingCache::default()));
        assert_eq!(
            selector.select("missing", b"k").unwrap_err(),
            Error::UnknownCluster("missing".into())
        );
    }

    #[test]
    fn test_empty_cluster_is_no_available_instance() {
        let cache = Arc::new(RingCache::default());
        cache.on_instances_updated("svc", 1, Vec::new()).unwrap();
        let selector = Selector::new(cache);
        assert_eq!(
            selector.select("svc", b"k").unwrap_err(),
            Error::NoAvailableInstance("svc".into())
        );
    }

    #[test]
    fn test_selection_is_counted_on_ring() {
        let cache = Arc::new(RingCache::default());
        cache
            .on_instances_updated("svc", 1, vec![Instance::new("a", "h", 1, 10)])
            .unwrap();
        let selector = Selector::new(Arc::clone(&cache));
        for i in 0..5 {
            selector.select("svc", format!("{i}").as_bytes()).unwrap();
        }
        let ring = cache.get("svc").unwrap();
        assert_eq!(ring.hit_counts()[0].1, 5);
    }
}

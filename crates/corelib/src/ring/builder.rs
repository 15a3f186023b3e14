//! Compiles a [`Snapshot`] into a [`HashRing`].
//!
//! # Algorithm
//!
//! 1. Keep the selectable instances (healthy, weight > 0), in snapshot order
//! 2. Pick the base unit from the configured [`Granularity`], scaling it up by
//!    the smallest integer factor that keeps the ring within
//!    `max(max_total_vnodes, 64 * instances)` vnodes
//! 3. Emit `max(1, round(weight / base_unit))` vnodes per instance, vnode `i`
//!    at `partition("{id}#{i}")`
//! 4. Sort by token, ties broken by instance id

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{Granularity, RingConfig, DEFAULT_BASE_UNIT, DEFAULT_MAX_TOTAL_VNODES};
use crate::error::Result;
use crate::instance::Instance;
use crate::partitioner::{Partitioner, Xxh3Partitioner};
use crate::ring::ring::HashRing;
use crate::snapshot::Snapshot;
use crate::vnode::VirtualNode;

/// Vnodes every instance may hold however low `max_total_vnodes` is set.
pub const MIN_VNODES_PER_INSTANCE: u64 = 64;

/// Builder for [`HashRing`]s; one builder serves every cluster.
///
/// # Example
///
/// ```rust
/// use corelib::{Instance, RingBuilder, Snapshot};
///
/// let snapshot = Snapshot::new(
///     "orders",
///     1,
///     vec![Instance::new("a", "10.0.0.1", 8080, 100)],
/// )
/// .unwrap();
/// let ring = RingBuilder::new().build(&snapshot);
/// assert_eq!(ring.lookup(b"user-1").unwrap().id().as_str(), "a");
/// ```
#[derive(Debug, Clone)]
pub struct RingBuilder {
    partitioner: Arc<dyn Partitioner>,
    granularity: Granularity,
    max_total_vnodes: u32,
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self {
            partitioner: Arc::new(Xxh3Partitioner),
            granularity: Granularity::default(),
            max_total_vnodes: DEFAULT_MAX_TOTAL_VNODES,
        }
    }
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `config` and build a builder from it.
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            partitioner: config.hash.partitioner(),
            granularity: config.granularity,
            max_total_vnodes: config.max_total_vnodes,
        })
    }

    pub fn with_partitioner(mut self, partitioner: Arc<dyn Partitioner>) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_max_total_vnodes(mut self, max_total_vnodes: u32) -> Self {
        self.max_total_vnodes = max_total_vnodes.max(1);
        self
    }

    pub fn partitioner(&self) -> &Arc<dyn Partitioner> {
        &self.partitioner
    }

    /// Build the ring for `snapshot`.
    pub fn build(&self, snapshot: &Snapshot) -> HashRing {
        let instances: Vec<Arc<Instance>> = snapshot.selectable().cloned().collect();
        if instances.is_empty() {
            debug!(cluster = %snapshot.cluster(), revision = snapshot.revision(), "no selectable instances, ring is empty");
            return HashRing::empty(snapshot.cluster().clone(), snapshot.revision(), Arc::clone(&self.partitioner));
        }

        let weights: Vec<u32> = instances.iter().map(|i| i.weight()).collect();
        let base_unit = self.base_unit_for(&weights);
        let vnode_counts: Vec<u32> = weights.iter().map(|&w| vnode_count(w, base_unit)).collect();
        let total: usize = vnode_counts.iter().map(|&c| c as usize).sum();

        let mut vnodes = Vec::with_capacity(total);
        for (owner, (instance, &count)) in instances.iter().zip(&vnode_counts).enumerate() {
            for index in 0..count {
                vnodes.push(VirtualNode::from_index(
                    self.partitioner.as_ref(),
                    instance.id(),
                    owner as u32,
                    index,
                ));
            }
        }
        vnodes.sort_unstable_by(|a, b| {
            a.token.cmp(&b.token).then_with(|| {
                instances[a.owner as usize]
                    .id()
                    .cmp(instances[b.owner as usize].id())
            })
        });

        debug!(
            cluster = %snapshot.cluster(),
            revision = snapshot.revision(),
            instances = instances.len(),
            vnodes = vnodes.len(),
            base_unit,
            "built ring"
        );

        HashRing::from_parts(
            snapshot.cluster().clone(),
            snapshot.revision(),
            Arc::clone(&self.partitioner),
            base_unit,
            instances,
            vnode_counts,
            vnodes,
        )
    }

    /// Base unit used for a ring over `weights`, after bounding the total.
    pub fn base_unit_for(&self, weights: &[u32]) -> f64 {
        let nominal = match self.granularity {
            Granularity::BaseUnit { base_unit } => base_unit,
            Granularity::Gcd { vnodes_per_unit } => {
                let unit = weights.iter().copied().fold(0, gcd);
                f64::from(unit) / f64::from(vnodes_per_unit)
            }
            Granularity::TargetTotal { vnodes } => {
                let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
                total as f64 / f64::from(vnodes)
            }
        };
        let nominal = if nominal.is_finite() && nominal > 0.0 {
            nominal
        } else {
            warn!(granularity = ?self.granularity, "unusable granularity, falling back to default base unit");
            DEFAULT_BASE_UNIT
        };

        let bound = u64::from(self.max_total_vnodes)
            .max(weights.len() as u64 * MIN_VNODES_PER_INSTANCE);
        if total_vnodes(weights, nominal) <= bound {
            return nominal;
        }
        if bound > u64::from(self.max_total_vnodes) {
            warn!(
                max_total_vnodes = self.max_total_vnodes,
                instances = weights.len(),
                bound,
                "vnode bound too small for instance count, raising it"
            );
        }

        // The total is non-increasing in the factor, and at `hi` every
        // instance is down to its single vnode.
        let heaviest = weights.iter().copied().max().unwrap_or(1);
        let mut lo = 1u64;
        let mut hi = ((2.0 * f64::from(heaviest) / nominal).floor() as u64).saturating_add(1);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if total_vnodes(weights, nominal * mid as f64) <= bound {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        let base_unit = nominal * lo as f64;
        debug!(nominal, base_unit, factor = lo, bound, "scaled base unit to bound ring size");
        base_unit
    }
}

/// `max(1, round(weight / base_unit))`.
pub fn vnode_count(weight: u32, base_unit: f64) -> u32 {
    let raw = (f64::from(weight) / base_unit).round();
    if raw >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        (raw as u32).max(1)
    }
}

fn total_vnodes(weights: &[u32], base_unit: f64) -> u64 {
    weights
        .iter()
        .map(|&w| u64::from(vnode_count(w, base_unit)))
        .sum()
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vnode_count_rounds_with_floor_of_one() {
        assert_eq!(vnode_count(100, 0.05), 2000);
        assert_eq!(vnode_count(1, 10.0), 1);
        assert_eq!(vnode_count(14, 10.0), 1);
        assert_eq!(vnode_count(15, 10.0), 2);
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(100, 300), 100);
        assert_eq!([100, 300, 500].into_iter().fold(0, gcd), 100);
        assert_eq!([7, 5].into_iter().fold(0, gcd), 1);
    }

    #[test]
    fn test_base_unit_fixed() {
        let builder = RingBuilder::new();
        assert_eq!(builder.base_unit_for(&[100, 300, 500]), DEFAULT_BASE_UNIT);
    }

    #[test]
    fn test_base_unit_gcd() {
        let builder = RingBuilder::new().with_granularity(Granularity::Gcd { vnodes_per_unit: 100 });
        assert_eq!(builder.base_unit_for(&[100, 300, 500]), 1.0);
    }

    #[test]
    fn test_base_unit_target_total() {
        let builder = RingBuilder::new().with_granularity(Granularity::TargetTotal { vnodes: 900 });
        assert_eq!(builder.base_unit_for(&[100, 300, 500]), 1.0);
    }

    #[test]
    fn test_base_unit_is_scaled_to_bound() {
        let builder = RingBuilder::new()
            .with_granularity(Granularity::BaseUnit { base_unit: 1.0 })
            .with_max_total_vnodes(1000);
        let weights = [1_000_000, 3_000_000];
        let base = builder.base_unit_for(&weights);
        assert!(total_vnodes(&weights, base) <= 1000);
        assert!(base >= 3990.0);
    }

    #[test]
    fn test_default_base_unit_holds_for_large_clusters() {
        let builder = RingBuilder::new();
        assert_eq!(builder.base_unit_for(&[100; 500]), DEFAULT_BASE_UNIT);
        assert_eq!(builder.base_unit_for(&[100; 1000]), DEFAULT_BASE_UNIT);
    }

    #[test]
    fn test_bound_below_instance_count_keeps_equal_counts() {
        let builder = RingBuilder::new().with_max_total_vnodes(2);
        let weights = [5, 5, 5, 5];
        let base = builder.base_unit_for(&weights);
        let total = total_vnodes(&weights, base);
        assert!(total <= 4 * MIN_VNODES_PER_INSTANCE);
        assert!(total > 4);
        assert_eq!(total % 4, 0);
    }

    #[test]
    fn test_bound_below_instance_count_keeps_weights_proportional() {
        let builder = RingBuilder::new().with_max_total_vnodes(4);
        let weights = [1, 1, 1, 1, 100];
        let base = builder.base_unit_for(&weights);
        let heavy = vnode_count(100, base);
        let light = vnode_count(1, base);
        assert!(total_vnodes(&weights, base) <= 5 * MIN_VNODES_PER_INSTANCE);
        assert!(heavy >= 50 * light, "heavy {heavy}, light {light}");
    }

    #[test]
    fn test_extreme_weight_spread_scales_quickly() {
        let builder = RingBuilder::new().with_max_total_vnodes(10);
        let mut weights = vec![1; 20];
        weights.push(50_000_000);

        let started = std::time::Instant::now();
        let base = builder.base_unit_for(&weights);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));

        let total = total_vnodes(&weights, base);
        assert!(total <= 21 * MIN_VNODES_PER_INSTANCE, "total {total}");
        assert!(vnode_count(50_000_000, base) > 1200);
        assert_eq!(vnode_count(1, base), 1);
    }

    #[test]
    fn test_unusable_granularity_falls_back() {
        let builder = RingBuilder::new().with_granularity(Granularity::BaseUnit { base_unit: 0.0 });
        assert_eq!(builder.base_unit_for(&[10]), DEFAULT_BASE_UNIT);
    }
}

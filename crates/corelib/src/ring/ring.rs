//! Hash ring data structure.
//!
//! A `HashRing` is compiled from exactly one [`Snapshot`](crate::Snapshot) by
//! the [`RingBuilder`](super::RingBuilder) and is never mutated afterwards;
//! a new revision produces a new ring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cluster::ClusterId;
use crate::instance::{Instance, InstanceId};
use crate::partitioner::Partitioner;
use crate::token::Token;
use crate::vnode::VirtualNode;

const RING_SPAN: f64 = 18_446_744_073_709_551_616.0; // 2^64

/// Weighted consistent hash ring for one cluster revision.
///
/// # Invariants
///
/// - `vnodes` is sorted by token, ties broken by owning instance id.
/// - Every instance in `instances` owns at least one vnode.
/// - `vnode_counts[i]` is the number of vnodes owned by `instances[i]`.
#[derive(Debug)]
pub struct HashRing {
    cluster: ClusterId,
    revision: u64,
    partitioner: Arc<dyn Partitioner>,
    base_unit: f64,
    instances: Vec<Arc<Instance>>,
    vnode_counts: Vec<u32>,
    vnodes: Vec<VirtualNode>,
    // Best-effort selection counters, one per instance. Not part of the
    // ring's identity and reset by every rebuild.
    hits: Vec<AtomicU64>,
}

impl HashRing {
    pub(crate) fn from_parts(
        cluster: ClusterId,
        revision: u64,
        partitioner: Arc<dyn Partitioner>,
        base_unit: f64,
        instances: Vec<Arc<Instance>>,
        vnode_counts: Vec<u32>,
        vnodes: Vec<VirtualNode>,
    ) -> Self {
        let hits = instances.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            cluster,
            revision,
            partitioner,
            base_unit,
            instances,
            vnode_counts,
            vnodes,
            hits,
        }
    }

    /// A ring with no entries; every lookup misses.
    pub fn empty(cluster: impl Into<ClusterId>, revision: u64, partitioner: Arc<dyn Partitioner>) -> Self {
        Self::from_parts(cluster.into(), revision, partitioner, 0.0, Vec::new(), Vec::new(), Vec::new())
    }

    pub fn cluster(&self) -> &ClusterId {
        &self.cluster
    }

    /// Revision of the snapshot this ring was built from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.vnodes.is_empty()
    }

    /// Total number of vnodes on the ring.
    pub fn token_count(&self) -> usize {
        self.vnodes.len()
    }

    /// Number of instances that own at least one vnode.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }

    pub fn instance(&self, owner: usize) -> Option<&Arc<Instance>> {
        self.instances.get(owner)
    }

    /// Sorted vnodes, for inspection and debugging.
    pub fn tokens(&self) -> &[VirtualNode] {
        &self.vnodes
    }

    /// Number of vnodes owned by instance `id` (0 if it is not on the ring).
    pub fn vnodes_of(&self, id: &str) -> usize {
        self.position_of(id)
            .map(|owner| self.vnode_counts[owner] as usize)
            .unwrap_or(0)
    }

    /// Weight units each vnode stood for when this ring was built.
    pub fn base_unit(&self) -> f64 {
        self.base_unit
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }

    /// Index of the vnode responsible for `token`: the first vnode whose
    /// token is `>= token`, wrapping to the first vnode.
    pub fn lookup_token(&self, token: Token) -> Option<usize> {
        if self.vnodes.is_empty() {
            return None;
        }
        let idx = self.vnodes.partition_point(|v| v.token < token);
        Some(if idx == self.vnodes.len() { 0 } else { idx })
    }

    /// Index in [`instances`](Self::instances) of the owner for `key`.
    pub fn owner_of(&self, key: &[u8]) -> Option<usize> {
        let token = self.partitioner.partition(key);
        self.lookup_token(token)
            .map(|idx| self.vnodes[idx].owner as usize)
    }

    /// Instance responsible for `key`.
    pub fn lookup(&self, key: &[u8]) -> Option<&Arc<Instance>> {
        self.owner_of(key).map(|owner| &self.instances[owner])
    }

    /// Distinct instances clockwise from `key`, starting with its owner.
    pub fn successors<'a>(&'a self, key: &[u8]) -> Successors<'a> {
        let start = self
            .lookup_token(self.partitioner.partition(key))
            .unwrap_or(0);
        Successors {
            ring: self,
            start,
            step: 0,
            seen: vec![false; self.instances.len()],
            emitted: 0,
        }
    }

    /// Fraction of the ring's key space owned by each instance.
    pub fn ownership(&self) -> Vec<(InstanceId, f64)> {
        let mut arcs = vec![0u128; self.instances.len()];
        let len = self.vnodes.len();
        match len {
            0 => {}
            1 => arcs[self.vnodes[0].owner as usize] = 1 << 64,
            _ => {
                for (j, vnode) in self.vnodes.iter().enumerate() {
                    let prev = &self.vnodes[(j + len - 1) % len];
                    arcs[vnode.owner as usize] += u128::from(prev.distance_to(vnode));
                }
                // Every vnode sits on the same token: the first one takes all.
                if arcs.iter().all(|&a| a == 0) {
                    arcs[self.vnodes[0].owner as usize] = 1 << 64;
                }
            }
        }
        self.instances
            .iter()
            .zip(arcs)
            .map(|(inst, arc)| (inst.id().clone(), arc as f64 / RING_SPAN))
            .collect()
    }

    pub(crate) fn record_hit(&self, owner: usize) {
        if let Some(counter) = self.hits.get(owner) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Selections served by this ring, per instance. Best-effort only.
    pub fn hit_counts(&self) -> Vec<(InstanceId, u64)> {
        self.instances
            .iter()
            .zip(&self.hits)
            .map(|(inst, hits)| (inst.id().clone(), hits.load(Ordering::Relaxed)))
            .collect()
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.id().as_str() == id)
    }
}

/// Iterator over distinct instances in clockwise ring order.
#[derive(Debug)]
pub struct Successors<'a> {
    ring: &'a HashRing,
    start: usize,
    step: usize,
    seen: Vec<bool>,
    emitted: usize,
}

impl<'a> Iterator for Successors<'a> {
    type Item = &'a Arc<Instance>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.ring.vnodes.len();
        while self.step < len && self.emitted < self.seen.len() {
            let vnode = self.ring.vnodes[(self.start + self.step) % len];
            self.step += 1;
            let owner = vnode.owner as usize;
            if !self.seen[owner] {
                self.seen[owner] = true;
                self.emitted += 1;
                return Some(&self.ring.instances[owner]);
            }
        }
        None
    }
}

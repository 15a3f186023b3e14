//! Ring configuration.
//!
//! Supplied once when the [`RingCache`](crate::cache::RingCache) is built and
//! never re-specified per call. All fields have defaults so an empty config
//! file is valid.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partitioner::{Blake3Partitioner, Partitioner, Sip13Partitioner, Xxh3Partitioner};

/// Default weight units per virtual node (weight 100 → 2000 vnodes).
pub const DEFAULT_BASE_UNIT: f64 = 0.05;

/// Default upper bound on the number of vnodes in one ring.
///
/// At the default base unit this holds 1048 instances of weight 100 before
/// the base unit is scaled.
pub const DEFAULT_MAX_TOTAL_VNODES: u32 = 2_097_152;

/// Hash function used for vnode placement and key lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    #[default]
    Xxh3,
    Sip13,
    Blake3,
}

impl HashAlgorithm {
    pub fn partitioner(self) -> Arc<dyn Partitioner> {
        match self {
            HashAlgorithm::Xxh3 => Arc::new(Xxh3Partitioner),
            HashAlgorithm::Sip13 => Arc::new(Sip13Partitioner),
            HashAlgorithm::Blake3 => Arc::new(Blake3Partitioner),
        }
    }
}

/// How much weight one virtual node stands for.
///
/// Only `BaseUnit` is independent of the snapshot being built. The other two
/// modes derive the unit from the current weights, so changing one instance
/// can shift every instance's vnode count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Granularity {
    /// Fixed weight units per vnode.
    BaseUnit { base_unit: f64 },
    /// `gcd(weights) / vnodes_per_unit` weight units per vnode.
    Gcd { vnodes_per_unit: u32 },
    /// `total_weight / vnodes` weight units per vnode.
    TargetTotal { vnodes: u32 },
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::BaseUnit {
            base_unit: DEFAULT_BASE_UNIT,
        }
    }
}

/// Which incoming revisions replace the published ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Ignore any revision `<=` the current one.
    #[default]
    RejectNotNewer,
    /// Ignore revisions `<` the current one; an equal revision rebuilds.
    RejectOlder,
}

impl StalenessPolicy {
    /// Whether `incoming` may replace a ring built from `current`.
    pub fn accepts(self, current: u64, incoming: u64) -> bool {
        match self {
            StalenessPolicy::RejectNotNewer => incoming > current,
            StalenessPolicy::RejectOlder => incoming >= current,
        }
    }
}

/// Configuration of ring construction and publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub hash: HashAlgorithm,
    pub granularity: Granularity,
    pub max_total_vnodes: u32,
    pub staleness: StalenessPolicy,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::default(),
            granularity: Granularity::default(),
            max_total_vnodes: DEFAULT_MAX_TOTAL_VNODES,
            staleness: StalenessPolicy::default(),
        }
    }
}

impl RingConfig {
    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        match self.granularity {
            Granularity::BaseUnit { base_unit } if !(base_unit.is_finite() && base_unit > 0.0) => {
                return Err(Error::InvalidConfig(format!(
                    "base_unit must be a positive finite number, got {base_unit}"
                )));
            }
            Granularity::Gcd { vnodes_per_unit: 0 } => {
                return Err(Error::InvalidConfig("vnodes_per_unit must be at least 1".into()));
            }
            Granularity::TargetTotal { vnodes: 0 } => {
                return Err(Error::InvalidConfig("target vnodes must be at least 1".into()));
            }
            _ => {}
        }
        if self.max_total_vnodes == 0 {
            return Err(Error::InvalidConfig("max_total_vnodes must be at least 1".into()));
        }
        Ok(())
    }
}

//! Service instance abstractions.
//!
//! Instances are immutable value objects. A weight or health change produces a
//! new `Instance`; nothing on the selection path ever mutates one in place.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifier of a single instance, unique within its cluster.
///
/// Newtype over `Arc<str>` so ring entries and snapshots share one allocation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct InstanceId(Arc<str>);

impl InstanceId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for InstanceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Health as reported by the circuit-breaking subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Unhealthy,
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

/// One addressable service endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    id: InstanceId,
    host: String,
    port: u16,
    weight: u32,
    health: HealthStatus,
    metadata: BTreeMap<String, String>,
}

impl Instance {
    /// Construct a healthy instance with no metadata.
    pub fn new(id: impl Into<InstanceId>, host: impl Into<String>, port: u16, weight: u32) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            weight,
            health: HealthStatus::Healthy,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_health(mut self, health: impl Into<HealthStatus>) -> Self {
        self.health = health.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// A copy of this instance carrying a different weight.
    pub fn reweighted(&self, weight: u32) -> Self {
        Self {
            weight,
            ..self.clone()
        }
    }

    pub fn id(&self) -> &InstanceId {
        &self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` of the endpoint.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn health(&self) -> HealthStatus {
        self.health
    }

    pub fn is_healthy(&self) -> bool {
        self.health == HealthStatus::Healthy
    }

    /// Healthy and carrying a non-zero weight; only these get ring entries.
    pub fn is_selectable(&self) -> bool {
        self.is_healthy() && self.weight > 0
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{} (weight {})", self.id, self.host, self.port, self.weight)
    }
}

/// Instance as delivered by the discovery transport.
///
/// Weights arrive signed on the wire; a negative weight is rejected when the
/// record is turned into an [`Instance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub host: String,
    pub port: u16,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default = "default_healthy")]
    pub healthy: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_weight() -> i64 {
    100
}

fn default_healthy() -> bool {
    true
}

impl InstanceRecord {
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16, weight: i64) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            weight,
            healthy: true,
            metadata: BTreeMap::new(),
        }
    }

    /// Convert into an [`Instance`], returning the reason on rejection.
    pub(crate) fn into_instance(self) -> std::result::Result<Instance, String> {
        if self.id.is_empty() {
            return Err("instance id must not be empty".to_string());
        }
        let weight = u32::try_from(self.weight).map_err(|_| {
            format!("instance `{}` has out-of-range weight {}", self.id, self.weight)
        })?;
        Ok(Instance {
            id: InstanceId::from(self.id),
            host: self.host,
            port: self.port,
            weight,
            health: HealthStatus::from(self.healthy),
            metadata: self.metadata,
        })
    }
}

impl From<&Instance> for InstanceRecord {
    fn from(instance: &Instance) -> Self {
        Self {
            id: instance.id.to_string(),
            host: instance.host.clone(),
            port: instance.port,
            weight: i64::from(instance.weight),
            healthy: instance.is_healthy(),
            metadata: instance.metadata.clone(),
        }
    }
}

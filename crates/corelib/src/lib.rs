//! Core library for weighted deterministic instance selection.
//!
//! This crate provides the in-memory selection pipeline of the discovery SDK:
//! - Instance and snapshot value types
//! - Partitioner (hash function) implementations
//! - Virtual node placement and the weighted hash ring
//! - The per-cluster ring cache and the selector reading from it
//!
//! Nothing here performs network I/O. Snapshots arrive already materialized
//! from the discovery client.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod instance;
pub mod partitioner;
pub mod ring;
pub mod selector;
pub mod snapshot;
pub mod token;
pub mod vnode;

pub use cache::{PublishOutcome, RingCache};
pub use cluster::ClusterId;
pub use config::{Granularity, HashAlgorithm, RingConfig, StalenessPolicy};
pub use error::{Error, Result};
pub use instance::{HealthStatus, Instance, InstanceId, InstanceRecord};
pub use partitioner::Partitioner;
pub use ring::{HashRing, Ring, RingBuilder};
pub use selector::Selector;
pub use snapshot::Snapshot;
pub use token::Token;
pub use vnode::VirtualNode;

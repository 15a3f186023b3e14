//! Replica selection over weighted hash rings.
//!
//! This crate answers "which instance, and which ones next" for a routing key:
//! - How many instances to return (the replication factor)
//! - Which instances, walking the ring clockwise from the key
//! - How to spread them across failure zones
//!
//! The first instance returned is always the one [`corelib::Selector`]
//! would pick, so fallbacks never disagree with the primary route.

pub mod error;
pub mod placement;
pub mod strategy;

pub use error::{ReplicationError, Result};
pub use placement::ReplicaPlacement;
pub use strategy::{ReplicationStrategy, SimpleStrategy, ZoneAwareStrategy};

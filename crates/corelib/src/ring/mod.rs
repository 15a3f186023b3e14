//! Consistent hash ring implementation.
//!
//! The ring maps token positions to instances and provides the lookup used
//! by the selector: hash the key, take the first vnode at or after it,
//! wrapping around the end of the ring.

pub mod builder;
pub mod ring;

pub use builder::RingBuilder;
pub use ring::{HashRing, Successors};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;

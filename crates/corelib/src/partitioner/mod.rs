//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners convert byte keys (routing keys and `"{id}#{index}"` vnode
//! keys alike) into tokens on the ring.

pub mod blake;
pub mod sip;
pub mod traits;
pub mod xxh3;

pub use blake::Blake3Partitioner;
pub use sip::Sip13Partitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;

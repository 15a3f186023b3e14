//! Inbound discovery feed for the ring cache.
//!
//! This crate carries instance-list pushes from the discovery client into
//! [`corelib::RingCache`]:
//! - The update protocol and its JSON / JSON-lines codec
//! - An async sender handed to the discovery side
//! - A receiver task that publishes every update, in arrival order

pub mod codec;
pub mod error;
pub mod protocol;
pub mod receiver;
pub mod sender;

use std::sync::Arc;

use corelib::RingCache;
use tokio::sync::mpsc;

pub use error::{Result, StreamingError};
pub use protocol::{Message, MessageType};
pub use receiver::{ReceiverStats, StreamReceiver};
pub use sender::StreamSender;

/// Create a bounded feed into `cache`.
///
/// Senders wait when `capacity` updates are queued. A capacity of 0 is
/// treated as 1.
pub fn channel(capacity: usize, cache: Arc<RingCache>) -> (StreamSender, StreamReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StreamSender::new(tx), StreamReceiver::new(rx, cache))
}

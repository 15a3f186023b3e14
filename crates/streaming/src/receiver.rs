//! Applies feed messages to the ring cache.

use std::sync::Arc;

use corelib::{PublishOutcome, RingCache};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::Message;

/// What the receiver did with the messages it drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub installed: u64,
    pub stale: u64,
    pub superseded: u64,
    /// Invalid instance lists; the ring was left untouched.
    pub rejected: u64,
    /// Clusters removed by `cluster_dropped` messages.
    pub dropped: u64,
}

impl ReceiverStats {
    pub fn total(&self) -> u64 {
        self.installed + self.stale + self.superseded + self.rejected + self.dropped
    }

    fn record(&mut self, outcome: PublishOutcome) {
        match outcome {
            PublishOutcome::Installed { .. } => self.installed += 1,
            PublishOutcome::Stale { .. } => self.stale += 1,
            PublishOutcome::Superseded { .. } => self.superseded += 1,
        }
    }
}

/// Cache-side end of the feed.
#[derive(Debug)]
pub struct StreamReceiver {
    rx: mpsc::Receiver<Message>,
    cache: Arc<RingCache>,
}

impl StreamReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<Message>, cache: Arc<RingCache>) -> Self {
        Self { rx, cache }
    }

    pub fn cache(&self) -> &Arc<RingCache> {
        &self.cache
    }

    /// Apply messages in arrival order until every sender is dropped.
    ///
    /// An invalid snapshot is counted and skipped; later messages are still
    /// applied.
    pub async fn run(mut self) -> ReceiverStats {
        let mut stats = ReceiverStats::default();
        while let Some(message) = self.rx.recv().await {
            self.apply(message, &mut stats);
        }
        info!(
            installed = stats.installed,
            stale = stats.stale,
            superseded = stats.superseded,
            rejected = stats.rejected,
            dropped = stats.dropped,
            "update feed closed"
        );
        stats
    }

    fn apply(&self, message: Message, stats: &mut ReceiverStats) {
        match message {
            Message::InstancesUpdated {
                cluster,
                revision,
                instances,
            } => match self.cache.on_records_updated(cluster.as_str(), revision, instances) {
                Ok(outcome) => stats.record(outcome),
                Err(err) => {
                    debug!(%cluster, revision, error = %err, "dropping invalid instance update");
                    stats.rejected += 1;
                }
            },
            Message::ClusterDropped { cluster } => {
                if self.cache.drop_cluster(&cluster) {
                    stats.dropped += 1;
                } else {
                    warn!(%cluster, "drop for unknown cluster");
                }
            }
        }
    }
}

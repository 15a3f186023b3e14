use corelib::InstanceRecord;
use tokio::sync::mpsc;

use crate::error::{Result, StreamingError};
use crate::protocol::Message;

/// Discovery-side handle of the feed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StreamSender {
    tx: mpsc::Sender<Message>,
}

impl StreamSender {
    pub(crate) fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Queue `message`, waiting while the feed is full.
    ///
    /// # Errors
    /// [`StreamingError::Closed`] once the receiver is gone.
    pub async fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).await.map_err(|_| StreamingError::Closed)
    }

    pub async fn instances_updated(
        &self,
        cluster: impl Into<String>,
        revision: u64,
        instances: Vec<InstanceRecord>,
    ) -> Result<()> {
        self.send(Message::InstancesUpdated {
            cluster: cluster.into(),
            revision,
            instances,
        })
        .await
    }

    pub async fn cluster_dropped(&self, cluster: impl Into<String>) -> Result<()> {
        self.send(Message::ClusterDropped {
            cluster: cluster.into(),
        })
        .await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

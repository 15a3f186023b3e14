//! Update messages pushed by the discovery client.
//!
//! On the wire each message is a JSON object tagged by `type`:
//!
//! ```text
//! {"type":"instances_updated","cluster":"orders","revision":7,"instances":[...]}
//! {"type":"cluster_dropped","cluster":"orders"}
//! ```

use std::fmt;

use corelib::InstanceRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Full instance list of `cluster` as of `revision`.
    InstancesUpdated {
        cluster: String,
        revision: u64,
        instances: Vec<InstanceRecord>,
    },
    /// `cluster` was removed from configuration.
    ClusterDropped { cluster: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    InstancesUpdated,
    ClusterDropped,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InstancesUpdated => "instances_updated",
            Self::ClusterDropped => "cluster_dropped",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::InstancesUpdated { .. } => MessageType::InstancesUpdated,
            Message::ClusterDropped { .. } => MessageType::ClusterDropped,
        }
    }

    pub fn cluster(&self) -> &str {
        match self {
            Message::InstancesUpdated { cluster, .. } | Message::ClusterDropped { cluster } => cluster,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matches_message_type() {
        let msg = Message::ClusterDropped { cluster: "orders".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], msg.message_type().as_str());
        assert_eq!(msg.cluster(), "orders");
    }

    #[test]
    fn test_record_defaults_apply() {
        let msg: Message = serde_json::from_str(
            r#"{"type":"instances_updated","cluster":"c","revision":3,
                "instances":[{"id":"a","host":"10.0.0.1","port":80}]}"#,
        )
        .unwrap();
        let Message::InstancesUpdated { instances, revision, .. } = msg else {
            panic!("wrong variant");
        };
        assert_eq!(revision, 3);
        assert_eq!(instances[0].weight, 100);
        assert!(instances[0].healthy);
    }
}

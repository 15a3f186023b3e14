use std::sync::Arc;

use corelib::{InstanceRecord, RingCache, Selector};
use streaming::{channel, codec, Message, ReceiverStats, StreamingError};

fn records(weights: &[i64]) -> Vec<InstanceRecord> {
    weights
        .iter()
        .enumerate()
        .map(|(i, &w)| InstanceRecord::new(format!("inst-{i}"), "127.0.0.1", 9100 + i as u16, w))
        .collect()
}

#[tokio::test]
async fn test_feed_installs_latest_revision() {
    let cache = Arc::new(RingCache::default());
    let (tx, rx) = channel(4, Arc::clone(&cache));
    let task = tokio::spawn(rx.run());

    tx.instances_updated("orders", 1, records(&[100])).await.unwrap();
    tx.instances_updated("orders", 3, records(&[100, 300, 500])).await.unwrap();
    tx.instances_updated("orders", 2, records(&[100, 300])).await.unwrap();
    drop(tx);

    let stats = task.await.unwrap();
    assert_eq!(stats.installed, 2);
    assert_eq!(stats.stale, 1);
    assert_eq!(cache.revision("orders"), Some(3));
    assert_eq!(cache.get("orders").unwrap().instance_count(), 3);
}

#[tokio::test]
async fn test_invalid_update_does_not_stop_feed() {
    let cache = Arc::new(RingCache::default());
    let (tx, rx) = channel(8, Arc::clone(&cache));
    let task = tokio::spawn(rx.run());

    tx.instances_updated("orders", 1, records(&[100])).await.unwrap();
    tx.instances_updated("orders", 2, records(&[100, -5])).await.unwrap();
    tx.instances_updated("orders", 3, records(&[50, 50])).await.unwrap();
    drop(tx);

    let stats = task.await.unwrap();
    assert_eq!(
        stats,
        ReceiverStats {
            installed: 2,
            rejected: 1,
            ..ReceiverStats::default()
        }
    );
    assert_eq!(cache.revision("orders"), Some(3));
}

#[tokio::test]
async fn test_cluster_dropped_resets_cluster() {
    let cache = Arc::new(RingCache::default());
    let (tx, rx) = channel(8, Arc::clone(&cache));
    let task = tokio::spawn(rx.run());

    tx.instances_updated("orders", 7, records(&[100])).await.unwrap();
    tx.cluster_dropped("orders").await.unwrap();
    tx.cluster_dropped("never-seen").await.unwrap();
    drop(tx);

    let stats = task.await.unwrap();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.total(), 2);
    let err = Selector::new(cache).select("orders", b"k").unwrap_err();
    assert_eq!(err, corelib::Error::UnknownCluster("orders".into()));
}

#[tokio::test]
async fn test_send_after_receiver_gone() {
    let cache = Arc::new(RingCache::default());
    let (tx, rx) = channel(1, cache);
    drop(rx);
    assert!(tx.is_closed());
    assert!(matches!(
        tx.cluster_dropped("orders").await,
        Err(StreamingError::Closed)
    ));
}

#[tokio::test]
async fn test_replay_decoded_lines() {
    let lines = codec::encode_lines(&[
        Message::InstancesUpdated {
            cluster: "monitor".into(),
            revision: 1,
            instances: records(&[100, 300, 500]),
        },
        Message::InstancesUpdated {
            cluster: "monitor".into(),
            revision: 2,
            instances: records(&[100, 500]),
        },
    ])
    .unwrap();

    let cache = Arc::new(RingCache::default());
    let (tx, rx) = channel(2, Arc::clone(&cache));
    let task = tokio::spawn(rx.run());
    for message in codec::decode_lines(&lines).unwrap() {
        tx.send(message).await.unwrap();
    }
    drop(tx);
    task.await.unwrap();

    let ring = cache.get("monitor").unwrap();
    assert_eq!(ring.revision(), 2);
    assert_eq!(ring.vnodes_of("inst-1"), 10_000);
}

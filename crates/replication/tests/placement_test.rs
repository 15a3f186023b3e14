use corelib::{Error, Instance, RingCache, Selector};
use replication::{ReplicaPlacement, ReplicationError, SimpleStrategy, ZoneAwareStrategy};
use std::sync::Arc;

fn cache_with(weights: &[u32]) -> Arc<RingCache> {
    let cache = Arc::new(RingCache::default());
    let instances = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            Instance::new(format!("inst-{i}"), "127.0.0.1", 8080 + i as u16, w)
                .with_metadata("zone", if i % 2 == 0 { "east" } else { "west" })
        })
        .collect();
    cache.on_instances_updated("svc", 4, instances).unwrap();
    cache
}

#[test]
fn test_primary_matches_selector() {
    let cache = cache_with(&[100, 300, 500, 200]);
    let selector = Selector::new(Arc::clone(&cache));
    let strategy = SimpleStrategy::new(3).unwrap();

    for i in 0..500 {
        let key = format!("{i}");
        let placement = ReplicaPlacement::resolve(&cache, &strategy, "svc", key.as_bytes()).unwrap();
        let selected = selector.select("svc", key.as_bytes()).unwrap();
        assert_eq!(placement.primary.id(), selected.id());
        assert_eq!(placement.fallbacks.len(), 2);
        assert!(placement.fallbacks.iter().all(|f| f.id() != selected.id()));
        assert_eq!(placement.revision, 4);
    }
}

#[test]
fn test_single_instance_has_no_fallbacks() {
    let cache = cache_with(&[100]);
    let placement =
        ReplicaPlacement::resolve(&cache, &SimpleStrategy::default(), "svc", b"k").unwrap();
    assert_eq!(placement.primary.id().as_str(), "inst-0");
    assert!(placement.fallbacks.is_empty());
    assert_eq!(placement.all().count(), 1);
}

#[test]
fn test_zone_aware_fallback_leaves_primary_zone() {
    let cache = cache_with(&[100, 100, 100, 100]);
    let strategy = ZoneAwareStrategy::new(2, "zone").unwrap();
    for i in 0..100 {
        let key = format!("user-{i}");
        let placement = ReplicaPlacement::resolve(&cache, &strategy, "svc", key.as_bytes()).unwrap();
        assert_eq!(placement.fallbacks.len(), 1);
        assert_ne!(
            placement.primary.metadata_value("zone"),
            placement.fallbacks[0].metadata_value("zone")
        );
    }
}

#[test]
fn test_errors_from_core_are_wrapped() {
    let cache = cache_with(&[100]);
    let strategy = SimpleStrategy::default();
    assert_eq!(
        ReplicaPlacement::resolve(&cache, &strategy, "other", b"k").unwrap_err(),
        ReplicationError::Core(Error::UnknownCluster("other".into()))
    );

    cache.on_instances_updated("svc", 5, Vec::new()).unwrap();
    assert_eq!(
        ReplicaPlacement::resolve(&cache, &strategy, "svc", b"k").unwrap_err(),
        ReplicationError::Core(Error::NoAvailableInstance("svc".into()))
    );
}

#[test]
fn test_strategy_as_trait_object() {
    let cache = cache_with(&[100, 100, 100]);
    let strategies: Vec<Box<dyn replication::ReplicationStrategy>> = vec![
        Box::new(SimpleStrategy::new(3).unwrap()),
        Box::new(ZoneAwareStrategy::new(3, "zone").unwrap()),
    ];
    for strategy in &strategies {
        let placement = ReplicaPlacement::resolve(&cache, strategy.as_ref(), "svc", b"k").unwrap();
        assert_eq!(placement.all().count(), 3);
    }
}

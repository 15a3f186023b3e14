//! `ringlb` subcommands.
//!
//! Each command loads its inputs, does the work against an in-process
//! [`RingCache`], and returns a [`CommandResult`] that renders as text.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use corelib::{Instance, RingCache, RingConfig, Selector, Snapshot};
use replication::{ReplicaPlacement, SimpleStrategy};
use streaming::{codec, ReceiverStats};
use tracing::info;

use crate::config::load_snapshot;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve keys against a snapshot.
    Select {
        /// Snapshot file (JSON).
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Instances to return per key, primary included.
        #[arg(short, long, default_value_t = 1)]
        replicas: usize,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Show per-instance vnode counts and ring ownership.
    Inspect {
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Select keys "0".."n-1" and compare counts with weights.
    Distribution {
        #[arg(short, long)]
        snapshot: PathBuf,

        #[arg(short, long, default_value_t = 10_000)]
        keys: usize,
    },

    /// Count keys that change instance between two snapshots.
    Churn {
        #[arg(long)]
        before: PathBuf,

        #[arg(long)]
        after: PathBuf,

        #[arg(short, long, default_value_t = 10_000)]
        keys: usize,
    },

    /// Push a JSON-lines update feed through the streaming receiver, then
    /// resolve keys against the final ring.
    Replay {
        #[arg(short, long)]
        updates: PathBuf,

        #[arg(long)]
        cluster: String,

        keys: Vec<String>,
    },
}

impl Command {
    pub fn execute(self, config: &RingConfig) -> Result<CommandResult> {
        match self {
            Command::Select {
                snapshot,
                replicas,
                keys,
            } => {
                let snapshot = load_snapshot(&snapshot)?;
                select(config, snapshot, replicas, &keys).map(CommandResult::Selected)
            }
            Command::Inspect { snapshot } => {
                let snapshot = load_snapshot(&snapshot)?;
                inspect(config, snapshot).map(CommandResult::Inspected)
            }
            Command::Distribution { snapshot, keys } => {
                let snapshot = load_snapshot(&snapshot)?;
                distribution(config, snapshot, keys).map(CommandResult::Distribution)
            }
            Command::Churn { before, after, keys } => {
                let before = load_snapshot(&before)?;
                let after = load_snapshot(&after)?;
                churn(config, before, after, keys).map(CommandResult::Churn)
            }
            Command::Replay {
                updates,
                cluster,
                keys,
            } => {
                let text = fs::read_to_string(&updates)
                    .with_context(|| format!("failed to read updates {}", updates.display()))?;
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(replay(config, &text, &cluster, &keys))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub key: String,
    pub revision: u64,
    pub primary: String,
    pub fallbacks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceReport {
    pub id: String,
    pub weight: u32,
    pub vnodes: usize,
    pub ownership: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RingReport {
    pub cluster: String,
    pub revision: u64,
    pub partitioner: &'static str,
    pub base_unit: f64,
    pub tokens: usize,
    pub instances: Vec<InstanceReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionRow {
    pub id: String,
    pub weight: u32,
    pub count: usize,
    /// `count` relative to the lightest instance's count.
    pub observed_ratio: f64,
    /// `weight` relative to the lightest instance's weight.
    pub expected_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionReport {
    pub keys: usize,
    pub rows: Vec<DistributionRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChurnReport {
    pub keys: usize,
    pub moved: usize,
    /// Moved keys whose old owner was removed or changed.
    pub from_changed: usize,
    /// Moved keys whose new owner was added or changed.
    pub to_changed: usize,
    /// Moved keys where neither owner changed.
    pub unexplained: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    Selected(Vec<Selection>),
    Inspected(RingReport),
    Distribution(DistributionReport),
    Churn(ChurnReport),
    Replayed {
        stats: ReceiverStats,
        selections: Vec<Selection>,
    },
}

fn cache_for(config: &RingConfig) -> Result<Arc<RingCache>> {
    Ok(Arc::new(RingCache::from_config(config)?))
}

/// Resolve `keys`, each with up to `replicas - 1` fallbacks.
pub fn select(
    config: &RingConfig,
    snapshot: Snapshot,
    replicas: usize,
    keys: &[String],
) -> Result<Vec<Selection>> {
    let cluster = snapshot.cluster().to_string();
    let cache = cache_for(config)?;
    cache.publish(snapshot);
    let strategy = SimpleStrategy::new(replicas)?;

    keys.iter()
        .map(|key| -> Result<Selection> {
            let placement = ReplicaPlacement::resolve(&cache, &strategy, &cluster, key.as_bytes())
                .with_context(|| format!("cannot resolve key {key:?}"))?;
            Ok(Selection {
                key: key.clone(),
                revision: placement.revision,
                primary: placement.primary.address(),
                fallbacks: placement.fallbacks.iter().map(|f| f.address()).collect(),
            })
        })
        .collect()
}

pub fn inspect(config: &RingConfig, snapshot: Snapshot) -> Result<RingReport> {
    let cluster = snapshot.cluster().to_string();
    let cache = cache_for(config)?;
    cache.publish(snapshot);
    let ring = cache
        .get(&cluster)
        .with_context(|| format!("cluster {cluster} was not published"))?;

    let ownership: HashMap<String, f64> = ring
        .ownership()
        .into_iter()
        .map(|(id, share)| (id.to_string(), share))
        .collect();
    let instances = ring
        .instances()
        .iter()
        .map(|inst| InstanceReport {
            id: inst.id().to_string(),
            weight: inst.weight(),
            vnodes: ring.vnodes_of(inst.id().as_str()),
            ownership: ownership.get(inst.id().as_str()).copied().unwrap_or_default(),
        })
        .collect();

    Ok(RingReport {
        cluster,
        revision: ring.revision(),
        partitioner: ring.partitioner_name(),
        base_unit: ring.base_unit(),
        tokens: ring.token_count(),
        instances,
    })
}

pub fn distribution(config: &RingConfig, snapshot: Snapshot, keys: usize) -> Result<DistributionReport> {
    let cluster = snapshot.cluster().to_string();
    let cache = cache_for(config)?;
    cache.publish(snapshot);
    let ring = cache
        .get(&cluster)
        .with_context(|| format!("cluster {cluster} was not published"))?;
    if ring.is_empty() {
        return Ok(DistributionReport { keys, rows: Vec::new() });
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..keys {
        let inst = Selector::select_in(&ring, i.to_string().as_bytes())?;
        *counts.entry(inst.id().to_string()).or_default() += 1;
    }

    let mut instances: Vec<&Arc<Instance>> = ring.instances().iter().collect();
    instances.sort_by_key(|inst| (inst.weight(), inst.id().clone()));

    let Some(lightest) = instances.first() else {
        return Ok(DistributionReport { keys, rows: Vec::new() });
    };
    let base_weight = f64::from(lightest.weight());
    let base_count = counts.get(lightest.id().as_str()).copied().unwrap_or_default() as f64;

    let rows = instances
        .iter()
        .map(|inst| {
            let count = counts.get(inst.id().as_str()).copied().unwrap_or_default();
            DistributionRow {
                id: inst.id().to_string(),
                weight: inst.weight(),
                count,
                observed_ratio: if base_count > 0.0 { count as f64 / base_count } else { f64::NAN },
                expected_ratio: f64::from(inst.weight()) / base_weight,
            }
        })
        .collect();
    Ok(DistributionReport { keys, rows })
}

pub fn churn(config: &RingConfig, before: Snapshot, after: Snapshot, keys: usize) -> Result<ChurnReport> {
    let builder = corelib::RingBuilder::from_config(config)?;
    let old = builder.build(&before);
    let new = builder.build(&after);

    // Changed: removed, added, reweighted or flipped health.
    let changed = |id: &str| match (before.get(id), after.get(id)) {
        (Some(b), Some(a)) => b.weight() != a.weight() || b.is_healthy() != a.is_healthy(),
        _ => true,
    };

    let mut report = ChurnReport {
        keys,
        ..ChurnReport::default()
    };
    for i in 0..keys {
        let key = i.to_string();
        let was = old.lookup(key.as_bytes()).map(|inst| inst.id().as_str());
        let now = new.lookup(key.as_bytes()).map(|inst| inst.id().as_str());
        if was == now {
            continue;
        }
        report.moved += 1;
        let from_changed = was.map_or(true, changed);
        let to_changed = now.map_or(true, changed);
        report.from_changed += usize::from(from_changed);
        report.to_changed += usize::from(to_changed);
        report.unexplained += usize::from(!from_changed && !to_changed);
    }
    Ok(report)
}

pub async fn replay(config: &RingConfig, updates: &str, cluster: &str, keys: &[String]) -> Result<CommandResult> {
    let messages = codec::decode_lines(updates)?;
    let cache = cache_for(config)?;
    let (tx, rx) = streaming::channel(64, Arc::clone(&cache));
    let receiver = tokio::spawn(rx.run());

    info!(messages = messages.len(), "replaying update feed");
    for message in messages {
        tx.send(message).await?;
    }
    drop(tx);
    let stats = receiver.await?;

    let selector = Selector::new(cache);
    let selections = keys
        .iter()
        .map(|key| -> Result<Selection> {
            let inst = selector
                .select(cluster, key.as_bytes())
                .with_context(|| format!("cannot resolve key {key:?}"))?;
            Ok(Selection {
                key: key.clone(),
                revision: selector.cache().revision(cluster).unwrap_or_default(),
                primary: inst.address(),
                fallbacks: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CommandResult::Replayed { stats, selections })
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} (revision {})", self.key, self.primary, self.revision)?;
        if !self.fallbacks.is_empty() {
            write!(f, " fallbacks: {}", self.fallbacks.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Selected(selections) => {
                for s in selections {
                    writeln!(f, "{s}")?;
                }
                Ok(())
            }
            CommandResult::Inspected(report) => {
                writeln!(
                    f,
                    "cluster {} revision {}: {} vnodes, {} partitioner, base unit {}",
                    report.cluster, report.revision, report.tokens, report.partitioner, report.base_unit
                )?;
                writeln!(f, "{:<24} {:>8} {:>8} {:>10}", "instance", "weight", "vnodes", "ownership")?;
                for row in &report.instances {
                    writeln!(
                        f,
                        "{:<24} {:>8} {:>8} {:>9.2}%",
                        row.id,
                        row.weight,
                        row.vnodes,
                        row.ownership * 100.0
                    )?;
                }
                Ok(())
            }
            CommandResult::Distribution(report) => {
                writeln!(f, "{} keys", report.keys)?;
                writeln!(f, "{:<24} {:>8} {:>8} {:>9} {:>9}", "instance", "weight", "count", "observed", "expected")?;
                for row in &report.rows {
                    writeln!(
                        f,
                        "{:<24} {:>8} {:>8} {:>9.2} {:>9.2}",
                        row.id, row.weight, row.count, row.observed_ratio, row.expected_ratio
                    )?;
                }
                Ok(())
            }
            CommandResult::Churn(report) => writeln!(
                f,
                "{} of {} keys moved ({} from changed instances, {} to changed instances, {} unexplained)",
                report.moved, report.keys, report.from_changed, report.to_changed, report.unexplained
            ),
            CommandResult::Replayed { stats, selections } => {
                writeln!(
                    f,
                    "applied {} updates: {} installed, {} stale, {} superseded, {} rejected, {} dropped",
                    stats.total(),
                    stats.installed,
                    stats.stale,
                    stats.superseded,
                    stats.rejected,
                    stats.dropped
                )?;
                for s in selections {
                    writeln!(f, "{s}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::InstanceRecord;
    use streaming::Message;

    fn snapshot(revision: u64, weights: &[(&str, u32)]) -> Snapshot {
        let instances = weights
            .iter()
            .enumerate()
            .map(|(i, &(id, w))| Instance::new(id, "127.0.0.1", 10030 + i as u16, w))
            .collect();
        Snapshot::new("monitor", revision, instances).unwrap()
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("k{i}")).collect()
    }

    #[test]
    fn test_select_with_fallbacks() {
        let snap = snapshot(1, &[("a", 100), ("b", 300), ("c", 500)]);
        let selections = select(&RingConfig::default(), snap, 2, &keys(20)).unwrap();
        assert_eq!(selections.len(), 20);
        for s in &selections {
            assert_eq!(s.fallbacks.len(), 1);
            assert_ne!(s.fallbacks[0], s.primary);
            assert_eq!(s.revision, 1);
        }
    }

    #[test]
    fn test_select_rejects_zero_replicas() {
        let snap = snapshot(1, &[("a", 100)]);
        assert!(select(&RingConfig::default(), snap, 0, &keys(1)).is_err());
    }

    #[test]
    fn test_inspect_reports_vnodes() {
        let snap = snapshot(3, &[("a", 100), ("b", 300), ("c", 500)]);
        let report = inspect(&RingConfig::default(), snap).unwrap();
        assert_eq!(report.tokens, 18_000);
        let vnodes: Vec<usize> = report.instances.iter().map(|r| r.vnodes).collect();
        assert_eq!(vnodes, vec![2000, 6000, 10_000]);
        let total: f64 = report.instances.iter().map(|r| r.ownership).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_matches_weights() {
        let snap = snapshot(1, &[("c", 500), ("a", 100), ("b", 300)]);
        let report = distribution(&RingConfig::default(), snap, 10_000).unwrap();
        assert_eq!(report.rows[0].id, "a");
        assert_eq!(report.rows.iter().map(|r| r.count).sum::<usize>(), 10_000);
        for row in &report.rows {
            assert!((row.observed_ratio - row.expected_ratio).abs() < 0.8, "{row:?}");
        }
    }

    #[test]
    fn test_distribution_of_empty_snapshot() {
        let report = distribution(&RingConfig::default(), Snapshot::empty("monitor", 1), 1000).unwrap();
        assert_eq!(report.keys, 1000);
        assert!(report.rows.is_empty());

        let unhealthy = Snapshot::new(
            "monitor",
            2,
            vec![Instance::new("a", "127.0.0.1", 10030, 100).with_health(false)],
        )
        .unwrap();
        let report = distribution(&RingConfig::default(), unhealthy, 1000).unwrap();
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_churn_only_from_removed_instance() {
        let before = snapshot(1, &[("a", 100), ("b", 300), ("c", 500)]);
        let after = snapshot(2, &[("a", 100), ("c", 500)]);
        let report = churn(&RingConfig::default(), before, after, 5000).unwrap();
        assert!(report.moved > 0);
        assert_eq!(report.from_changed, report.moved);
        assert_eq!(report.unexplained, 0);
    }

    #[test]
    fn test_replay_feed() {
        let feed = codec::encode_lines(&[
            Message::InstancesUpdated {
                cluster: "monitor".into(),
                revision: 2,
                instances: vec![InstanceRecord::new("a", "127.0.0.1", 10030, 100)],
            },
            Message::InstancesUpdated {
                cluster: "monitor".into(),
                revision: 1,
                instances: vec![InstanceRecord::new("b", "127.0.0.1", 10031, 100)],
            },
        ])
        .unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = runtime
            .block_on(replay(&RingConfig::default(), &feed, "monitor", &keys(3)))
            .unwrap();
        let CommandResult::Replayed { stats, selections } = result else {
            panic!("unexpected result");
        };
        assert_eq!((stats.installed, stats.stale), (1, 1));
        assert!(selections.iter().all(|s| s.primary == "127.0.0.1:10030"));
    }
}

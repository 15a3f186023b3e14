//! Command-line flags, ring configuration and snapshot files.
//!
//! The ring configuration is TOML with every field optional:
//!
//! ```toml
//! hash = "xxh3"
//! max_total_vnodes = 2097152
//! staleness = "reject_not_newer"
//!
//! [granularity]
//! mode = "base_unit"
//! base_unit = 0.05
//! ```
//!
//! Snapshot files are JSON: `{"cluster": "...", "revision": 1, "instances": [...]}`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use corelib::{InstanceRecord, RingConfig, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::Command;

#[derive(Parser, Debug)]
#[command(name = "ringlb", version, about = "Weighted consistent-hash instance selection")]
pub struct CliConfig {
    /// Ring configuration file (TOML).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, overridden by `RUST_LOG`.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(self) -> Result<()> {
        setup_tracing(&self.log_level);
        let ring_config = load_ring_config(self.config.as_deref())?;
        let result = self.command.execute(&ring_config)?;
        println!("{result}");
        Ok(())
    }
}

fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be set when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load and validate the ring configuration; defaults when `path` is `None`.
pub fn load_ring_config(path: Option<&Path>) -> Result<RingConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            parse_ring_config(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => RingConfig::default(),
    };
    debug!(?config, "ring configuration");
    Ok(config)
}

pub fn parse_ring_config(text: &str) -> Result<RingConfig> {
    let config: RingConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// On-disk shape of one cluster snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub cluster: String,
    #[serde(default)]
    pub revision: u64,
    pub instances: Vec<InstanceRecord>,
}

impl SnapshotFile {
    pub fn into_snapshot(self) -> Result<Snapshot> {
        Ok(Snapshot::from_records(self.cluster, self.revision, self.instances)?)
    }
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_str(&text)
        .with_context(|| format!("malformed snapshot {}", path.display()))?;
    file.into_snapshot()
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

//! `ringlb`: offline tooling for weighted hash rings.
//!
//! Provides commands for:
//! - Resolving keys (and fallbacks) against a snapshot file
//! - Inspecting vnode counts and ring ownership
//! - Checking weighted proportionality and churn between two snapshots
//! - Replaying a recorded discovery feed

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;

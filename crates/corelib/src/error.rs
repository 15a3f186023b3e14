//! Error types for the core library.

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// `UnknownCluster` and `NoAvailableInstance` are ordinary, transient
/// outcomes of a selection. `InvalidSnapshot` and `InvalidConfig` point at a
/// defect upstream and should be surfaced loudly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No snapshot was ever published for the cluster.
    #[error("unknown cluster `{0}`: no snapshot has been published")]
    UnknownCluster(String),
    /// The cluster is known but has no healthy, non-zero-weight instance.
    #[error("no available instance in cluster `{0}`")]
    NoAvailableInstance(String),
    /// Snapshot construction was given inconsistent input.
    #[error("invalid snapshot for cluster `{cluster}` at revision {revision}: {reason}")]
    InvalidSnapshot {
        cluster: String,
        revision: u64,
        reason: String,
    },
    /// Ring configuration failed validation.
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for errors the caller is expected to retry or fall back on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::UnknownCluster(_) | Error::NoAvailableInstance(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::UnknownCluster("c".into()).is_transient());
        assert!(Error::NoAvailableInstance("c".into()).is_transient());
        assert!(!Error::InvalidConfig("bad".into()).is_transient());
        assert!(!Error::InvalidSnapshot {
            cluster: "c".into(),
            revision: 1,
            reason: "duplicate".into(),
        }
        .is_transient());
    }

    #[test]
    fn test_display_names_cluster() {
        let err = Error::NoAvailableInstance("orders".into());
        assert_eq!(err.to_string(), "no available instance in cluster `orders`");
    }
}

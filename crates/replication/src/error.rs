use thiserror::Error;

/// Errors from replica resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    #[error(transparent)]
    Core(#[from] corelib::Error),

    #[error("replication factor must be at least 1, got {0}")]
    InvalidFactor(usize),
}

pub type Result<T> = std::result::Result<T, ReplicationError>;

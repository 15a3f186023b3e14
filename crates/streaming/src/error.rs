use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamingError {
    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("line {line}: malformed message: {source}")]
    Line {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("update channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, StreamingError>;

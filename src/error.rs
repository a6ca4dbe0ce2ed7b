use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by anything that touches persisted state
/// (word weights, policy rules, snapshots).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to move temp file into {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot schema mismatch: got {found}, expected {expected}")]
    SchemaMismatch { found: u32, expected: u32 },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that terminate the interactive loop.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("interactive loop cancelled")]
    Cancelled,

    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

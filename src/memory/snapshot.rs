use crate::error::{StorageError, StorageResult};
use crate::memory::persist::{atomic_write_json, read_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SNAPSHOT_SCHEMA: u32 = 1;

/// Point-in-time dump of the agent's state, used for rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "self")]
    pub identity: Map<String, Value>,
    pub beliefs: Vec<String>,
    pub weights: HashMap<String, f64>,
    pub features: HashMap<String, bool>,
    pub notes: String,
}

impl Snapshot {
    pub fn new(identity: Map<String, Value>, weights: HashMap<String, f64>, notes: impl Into<String>) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA,
            timestamp: Utc::now(),
            identity,
            beliefs: Vec::new(),
            weights,
            features: HashMap::new(),
            notes: notes.into(),
        }
    }

    /// `<dir>/run-2024-01-31T12-00-00Z.json`
    pub fn file_name(&self) -> String {
        format!("run-{}.json", self.timestamp.format("%Y-%m-%dT%H-%M-%SZ"))
    }

    /// Atomically write the snapshot into `dir`, returning the file path.
    pub fn save_in(&self, dir: &Path) -> StorageResult<PathBuf> {
        let path = dir.join(self.file_name());
        atomic_write_json(&path, self)?;
        tracing::info!("snapshot saved to {}", path.display());
        Ok(path)
    }

    /// Read a snapshot, rejecting any schema other than the current one.
    pub fn load(path: &Path) -> StorageResult<Self> {
        let snap: Snapshot = read_json(path)?;
        if snap.schema != SNAPSHOT_SCHEMA {
            return Err(StorageError::SchemaMismatch {
                found: snap.schema,
                expected: SNAPSHOT_SCHEMA,
            });
        }
        Ok(snap)
    }
}

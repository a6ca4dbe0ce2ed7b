use crate::kernel::mood::DEFAULT_DECAY_RATE;
use crate::kernel::telemetry::recorder::{DEFAULT_HEARTBEAT, DEFAULT_QUEUE_CAPACITY};
use crate::kernel::telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime settings. Every field has a default, so a config file only needs
/// the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeonConfig {
    /// Base directory; all state lives under `<root>/data`.
    pub root: PathBuf,
    /// Mood score units pulled toward zero per second.
    pub decay_rate: f64,
    pub queue_capacity: usize,
    pub heartbeat_secs: u64,
    /// Top words checked for rule proposals after each input.
    pub rule_candidates: usize,
    /// Top words attached to each INPUT event.
    pub log_top_words: usize,
}

impl Default for NeonConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            decay_rate: DEFAULT_DECAY_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_secs: DEFAULT_HEARTBEAT.as_secs(),
            rule_candidates: 3,
            log_top_words: 5,
        }
    }
}

impl NeonConfig {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn weights_path(&self) -> PathBuf {
        self.data_dir().join("beliefs").join("weights.json")
    }

    pub fn policy_path(&self) -> PathBuf {
        self.data_dir().join("policy").join("policy.json")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.data_dir().join("events")
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir().join("snapshots")
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            dir: self.events_dir(),
            queue_capacity: self.queue_capacity,
            heartbeat: Duration::from_secs(self.heartbeat_secs.max(1)),
        }
    }
}

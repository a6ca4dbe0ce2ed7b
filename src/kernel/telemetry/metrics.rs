use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time read of the pipeline's liveness counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub uptime_sec: u64,
    /// Events accepted into the queue.
    pub events: u64,
    /// Events lost: dropped on a full queue or failed to write.
    pub errors: u64,
}

/// Process counters owned by one pipeline instance. Every method is a
/// single atomic operation and safe from any task.
#[derive(Debug)]
pub struct HealthCounters {
    started_at: DateTime<Utc>,
    started: Instant,
    events: AtomicU64,
    errors: AtomicU64,
}

impl HealthCounters {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            events: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn inc_events(&self) {
        self.events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            uptime_sec: self.started.elapsed().as_secs(),
            events: self.events.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

impl Default for HealthCounters {
    fn default() -> Self {
        Self::new()
    }
}

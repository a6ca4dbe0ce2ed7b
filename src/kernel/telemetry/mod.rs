//! Event telemetry: a lossy queue in front of day-partitioned JSONL files.
//!
//! # SAFETY INVARIANT
//! Telemetry is a side-effect layer. Producers never wait on it and never
//! see its failures; it must not perturb the conversation loop.

pub mod metrics;
pub mod recorder;
pub mod sink;

pub use metrics::{HealthCounters, HealthSnapshot};
pub use recorder::{PipelineState, TelemetryConfig, TelemetryPipeline};
pub use sink::DailyLogWriter;

use super::metrics::{HealthCounters, HealthSnapshot};
use super::sink::DailyLogWriter;
use crate::kernel::event::{Event, EventType};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const CLOSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Stopping,
    Closed,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Directory that receives `events-YYYY-MM-DD.jsonl` files.
    pub dir: PathBuf,
    pub queue_capacity: usize,
    pub heartbeat: Duration,
}

impl TelemetryConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat: DEFAULT_HEARTBEAT,
        }
    }
}

#[derive(Debug)]
struct Shared {
    tx: mpsc::Sender<Event>,
    health: HealthCounters,
    state: AtomicU8,
}

impl Shared {
    fn log(&self, event: Event) {
        if self.state.load(Ordering::Acquire) != RUNNING {
            return;
        }
        match self.tx.try_send(event) {
            Ok(()) => self.health.inc_events(),
            Err(TrySendError::Full(_)) => self.health.inc_errors(),
            // Consumer already gone: shutting down
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Lossy, non-blocking event log.
///
/// # BACKPRESSURE INVARIANT
/// `log` never waits. A full queue drops the event and bumps the error
/// counter; interactive latency always wins over audit completeness.
///
/// One consumer task owns the log files; one heartbeat task feeds HEALTH
/// events through the same `log` path. Both stop on a shared token and are
/// joined by [`close`](Self::close).
#[derive(Debug)]
pub struct TelemetryPipeline {
    shared: Arc<Shared>,
    shutdown: CancellationToken,
    tasks: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl TelemetryPipeline {
    /// Spawn the consumer and heartbeat tasks. Must run inside a tokio runtime.
    pub fn start(config: TelemetryConfig) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let shared = Arc::new(Shared {
            tx,
            health: HealthCounters::new(),
            state: AtomicU8::new(RUNNING),
        });
        let shutdown = CancellationToken::new();

        let writer = DailyLogWriter::new(config.dir.clone());
        let consumer = tokio::spawn(consume(rx, writer, shared.clone(), shutdown.clone()));
        let heartbeat = tokio::spawn(heartbeat(shared.clone(), shutdown.clone(), config.heartbeat));

        info!(
            "telemetry started: dir={}, capacity={}, heartbeat={:?}",
            config.dir.display(),
            capacity,
            config.heartbeat
        );

        Self {
            shared,
            shutdown,
            tasks: Mutex::new(Some((consumer, heartbeat))),
        }
    }

    /// Queue an event. Never blocks; a no-op once `close` has begun.
    pub fn log(&self, event: Event) {
        self.shared.log(event);
    }

    pub fn health(&self) -> HealthSnapshot {
        self.shared.health.snapshot()
    }

    pub fn state(&self) -> PipelineState {
        match self.shared.state.load(Ordering::Acquire) {
            RUNNING => PipelineState::Running,
            STOPPING => PipelineState::Stopping,
            _ => PipelineState::Closed,
        }
    }

    /// Stop both tasks, write out what is already queued, close the file.
    /// Only the first call does anything; after it returns nothing more is
    /// written.
    pub async fn close(&self) {
        if self
            .shared
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        self.shutdown.cancel();

        if let Some((consumer, heartbeat)) = self.tasks.lock().await.take() {
            // Heartbeat first: its last tick must not race the file close.
            if let Err(e) = heartbeat.await {
                warn!("telemetry heartbeat task failed: {}", e);
            }
            if let Err(e) = consumer.await {
                warn!("telemetry consumer task failed: {}", e);
            }
        }

        self.shared.state.store(CLOSED, Ordering::Release);
        info!("telemetry closed: {:?}", self.health());
    }
}

impl Drop for TelemetryPipeline {
    fn drop(&mut self) {
        // Unclosed pipeline: let the tasks drain and exit on their own.
        self.shutdown.cancel();
    }
}

async fn consume(
    mut rx: mpsc::Receiver<Event>,
    mut writer: DailyLogWriter,
    shared: Arc<Shared>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = rx.recv() => match next {
                Some(event) => write_one(&mut writer, &shared, &event).await,
                None => break,
            },
        }
    }

    // Refuse new sends, then drain whatever made it in before shutdown.
    rx.close();
    while let Some(event) = rx.recv().await {
        write_one(&mut writer, &shared, &event).await;
    }

    if let Err(e) = writer.close().await {
        warn!("failed to close event log: {}", e);
    }
    debug!("telemetry consumer stopped");
}

async fn write_one(writer: &mut DailyLogWriter, shared: &Shared, event: &Event) {
    if let Err(e) = writer.write(event).await {
        shared.health.inc_errors();
        warn!("failed to write {} event: {}", event.kind, e);
    }
}

async fn heartbeat(shared: Arc<Shared>, shutdown: CancellationToken, period: Duration) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let h = shared.health.snapshot();
                shared.log(Event::new(
                    EventType::Health,
                    "system",
                    json!({
                        "uptime_sec": h.uptime_sec,
                        "events": h.events,
                        "errors": h.errors,
                    }),
                ));
            }
        }
    }
}

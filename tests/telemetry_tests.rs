use chrono::{NaiveDate, TimeZone, Utc};
use neon::kernel::event::{Event, EventType};
use neon::kernel::telemetry::sink::log_file_name;
use neon::kernel::telemetry::{DailyLogWriter, PipelineState, TelemetryConfig, TelemetryPipeline};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn read_events(path: &Path) -> Vec<Event> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_queue_drops_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TelemetryPipeline::start(TelemetryConfig::new(dir.path()));

    // No await in between: the consumer cannot make progress.
    for i in 0..101 {
        pipeline.log(Event::new(EventType::Input, "test", json!({ "n": i })));
    }
    let health = pipeline.health();
    assert_eq!(health.errors, 1, "Exactly one drop");
    assert_eq!(health.events, 100);

    pipeline.close().await;

    let today = Utc::now().date_naive();
    let written = read_events(&dir.path().join(log_file_name(today)));
    assert_eq!(written.len(), 100, "Queued events are flushed on close");
    assert_eq!(written[0].payload["n"], 0);
}

#[tokio::test]
async fn test_events_partitioned_by_day() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TelemetryPipeline::start(TelemetryConfig::new(dir.path()));

    let day1 = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 58).unwrap();
    let day2 = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 1).unwrap();
    pipeline.log(Event::at(day1, EventType::Input, "console", json!({ "text": "late" })));
    pipeline.log(Event::at(day1, EventType::Output, "agent", json!({ "text": "still late" })));
    pipeline.log(Event::at(day2, EventType::Input, "console", json!({ "text": "early" })));
    pipeline.close().await;

    let first = read_events(&dir.path().join("events-2024-05-01.jsonl"));
    let second = read_events(&dir.path().join("events-2024-05-02.jsonl"));
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert!(first.iter().all(|e| e.time().date_naive() == day1.date_naive()));
    assert!(second.iter().all(|e| e.time().date_naive() == day2.date_naive()));
}

#[tokio::test]
async fn test_record_shape() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TelemetryPipeline::start(TelemetryConfig::new(dir.path()));
    let at = Utc.with_ymd_and_hms(2024, 1, 31, 8, 0, 0).unwrap();
    pipeline.log(Event::at(at, EventType::Propose, "agent", json!({ "word": "hello", "count": 3 })));
    pipeline.close().await;

    let raw = fs::read_to_string(dir.path().join("events-2024-01-31.jsonl")).unwrap();
    let line: serde_json::Value = serde_json::from_str(raw.trim_end()).unwrap();
    assert_eq!(line["timestamp"], at.timestamp());
    assert_eq!(line["type"], "PROPOSE");
    assert_eq!(line["source"], "agent");
    assert_eq!(line["payload"]["word"], "hello");
    assert!(raw.ends_with('\n'));
}

#[tokio::test]
async fn test_log_after_close_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TelemetryPipeline::start(TelemetryConfig::new(dir.path()));
    assert_eq!(pipeline.state(), PipelineState::Running);

    pipeline.log(Event::new(EventType::Boot, "system", json!({})));
    pipeline.close().await;
    assert_eq!(pipeline.state(), PipelineState::Closed);

    let before = pipeline.health();
    pipeline.log(Event::new(EventType::Exit, "console", json!({})));
    let after = pipeline.health();
    assert_eq!(before.events, after.events);
    assert_eq!(before.errors, after.errors);

    // Second close does nothing
    pipeline.close().await;

    let today = Utc::now().date_naive();
    let written = read_events(&dir.path().join(log_file_name(today)));
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].kind, EventType::Boot);
}

#[tokio::test]
async fn test_heartbeat_emits_health() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = TelemetryConfig::new(dir.path());
    config.heartbeat = Duration::from_millis(40);
    let pipeline = TelemetryPipeline::start(config);

    tokio::time::sleep(Duration::from_millis(250)).await;
    pipeline.close().await;

    let today = Utc::now().date_naive();
    let written = read_events(&dir.path().join(log_file_name(today)));
    let health: Vec<&Event> = written.iter().filter(|e| e.kind == EventType::Health).collect();
    assert!(!health.is_empty(), "Heartbeat should have fired");
    assert_eq!(health[0].source, "system");
    assert!(health[0].payload.contains_key("uptime_sec"));
    assert!(health[0].payload.contains_key("events"));
    assert!(health[0].payload.contains_key("errors"));
}

#[tokio::test]
async fn test_write_failures_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the log directory should be
    let blocked = dir.path().join("events");
    fs::write(&blocked, "not a directory").unwrap();

    let pipeline = TelemetryPipeline::start(TelemetryConfig::new(&blocked));
    pipeline.log(Event::new(EventType::Input, "console", json!({})));
    pipeline.close().await;

    let health = pipeline.health();
    assert_eq!(health.events, 1);
    assert_eq!(health.errors, 1);
}

#[tokio::test]
async fn test_writer_rotates_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = DailyLogWriter::new(dir.path().join("nested").join("events"));

    for (d, n) in [(1, 3), (2, 1), (3, 2)] {
        let at = Utc.with_ymd_and_hms(2023, 12, d, 12, 0, 0).unwrap();
        for _ in 0..n {
            writer.write(&Event::at(at, EventType::Input, "console", json!({}))).await.unwrap();
        }
    }
    writer.close().await.unwrap();

    for (d, n) in [(1, 3), (2, 1), (3, 2)] {
        let day = NaiveDate::from_ymd_opt(2023, 12, d).unwrap();
        assert_eq!(read_events(&writer.path_for(day)).len(), n);
    }

    // Reopening an existing day appends
    let at = Utc.with_ymd_and_hms(2023, 12, 1, 18, 0, 0).unwrap();
    writer.write(&Event::at(at, EventType::Exit, "console", json!({}))).await.unwrap();
    writer.close().await.unwrap();
    let day1 = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
    assert_eq!(read_events(&writer.path_for(day1)).len(), 4);
}

#[test]
fn test_non_object_payload_is_wrapped() {
    let ev = Event::new(EventType::Reflect, "agent", json!("just text"));
    assert_eq!(ev.payload["value"], "just text");
    assert!(Event::new(EventType::Boot, "system", serde_json::Value::Null).payload.is_empty());
}

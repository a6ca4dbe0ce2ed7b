use chrono::Utc;
use neon::kernel::event::{Event, EventType};
use neon::kernel::telemetry::sink::log_file_name;
use neon::kernel::telemetry::TelemetryPipeline;
use neon::policy::Rule;
use neon::{AgentError, NeonConfig, Reactor};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn setup(dir: &tempfile::TempDir) -> (NeonConfig, Arc<TelemetryPipeline>) {
    let config = NeonConfig::with_root(dir.path());
    let telemetry = Arc::new(TelemetryPipeline::start(config.telemetry()));
    (config, telemetry)
}

fn logged_kinds(config: &NeonConfig) -> Vec<EventType> {
    let path = config.events_dir().join(log_file_name(Utc::now().date_naive()));
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str::<Event>(l).unwrap().kind)
        .collect()
}

#[tokio::test]
async fn test_conversation_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (config, telemetry) = setup(&dir);
    let mut reactor = Reactor::with_seed(config.clone(), telemetry.clone(), 7);

    let input: &[u8] = b"hello world\n\nhello there\nexit\n";
    let mut output = Vec::new();
    reactor.run(input, &mut output, CancellationToken::new()).await.unwrap();
    telemetry.close().await;

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("Type something (or 'exit' to quit):"));
    assert!(text.contains("I created a new rule for 'hello'."));
    assert!(text.contains("Goodbye."));
    assert!(text.contains("Health summary: uptime="));

    let weights: HashMap<String, u64> =
        serde_json::from_str(&fs::read_to_string(config.weights_path()).unwrap()).unwrap();
    assert_eq!(weights.get("hello"), Some(&2));
    assert_eq!(weights.get("world"), Some(&1));

    let rules: Vec<Rule> = serde_json::from_str(&fs::read_to_string(config.policy_path()).unwrap()).unwrap();
    assert!(rules.iter().any(|r| r.when.word == "hello"));

    let kinds = logged_kinds(&config);
    assert_eq!(kinds.first(), Some(&EventType::Boot));
    assert_eq!(kinds.last(), Some(&EventType::Exit));
    for k in [EventType::Input, EventType::Output, EventType::Propose] {
        assert!(kinds.contains(&k), "missing {k}");
    }
    assert_eq!(kinds.iter().filter(|k| **k == EventType::Input).count(), 2, "Blank lines are skipped");
}

#[tokio::test]
async fn test_end_of_input_saves_like_exit() {
    let dir = tempfile::tempdir().unwrap();
    let (config, telemetry) = setup(&dir);
    let mut reactor = Reactor::with_seed(config.clone(), telemetry.clone(), 1);

    let input: &[u8] = b"just one line";
    let mut output = Vec::new();
    reactor.run(input, &mut output, CancellationToken::new()).await.unwrap();
    telemetry.close().await;

    assert!(String::from_utf8(output).unwrap().contains("Goodbye."));
    assert!(config.weights_path().exists());
    assert!(logged_kinds(&config).contains(&EventType::Exit));
}

#[tokio::test]
async fn test_cancelled_loop_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let (config, telemetry) = setup(&dir);
    let mut reactor = Reactor::with_seed(config, telemetry.clone(), 1);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let input: &[u8] = b"never processed\n";
    let mut output = Vec::new();
    let result = reactor.run(input, &mut output, cancel).await;
    assert!(matches!(result, Err(AgentError::Cancelled)));
    assert_eq!(reactor.weights.count("never"), 0);
    telemetry.close().await;
}

#[tokio::test]
async fn test_policy_override_wins() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeonConfig::with_root(dir.path());
    let seeded = neon::policy::RuleEngine::new(config.policy_path());
    seeded.add_rule(Rule::new("", "", "Always this."));
    seeded.save().unwrap();

    let telemetry = Arc::new(TelemetryPipeline::start(config.telemetry()));
    let mut reactor = Reactor::with_seed(config, telemetry.clone(), 3);
    assert_eq!(reactor.policy.len(), 1);

    let out = reactor.handle_line("I want pizza");
    assert!(out.contains(&"(neutral) Always this.".to_string()), "got {out:?}");
    // New rules are appended behind the wildcard
    assert_eq!(reactor.policy.rules()[0].then, "Always this.");
    assert!(reactor.policy.has_rule_for("pizza"));
    telemetry.close().await;
}

#[tokio::test]
async fn test_rule_edited_only_on_mood_change() {
    let dir = tempfile::tempdir().unwrap();
    let (config, telemetry) = setup(&dir);
    let mut reactor = Reactor::with_seed(config.clone(), telemetry.clone(), 5);

    let out = reactor.handle_line("hello");
    assert!(out.contains(&"(neutral) I created a new rule for 'hello'.".to_string()));

    let out = reactor.handle_line("hello");
    assert!(!out.iter().any(|l| l.contains("updated")), "Same mood, no edit: {out:?}");

    let out = reactor.handle_line("hello love great awesome");
    assert!(out.contains(&"(positive) I updated my rule for 'hello'.".to_string()), "got {out:?}");
    assert_eq!(
        reactor.policy.rule_for("hello").unwrap().then,
        "Now I feel positive about 'hello'."
    );

    telemetry.close().await;
    let kinds = logged_kinds(&config);
    assert_eq!(kinds.iter().filter(|k| **k == EventType::Edit).count(), 1);
}

#[tokio::test]
async fn test_malformed_state_falls_back_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = NeonConfig::with_root(dir.path());
    fs::create_dir_all(config.weights_path().parent().unwrap()).unwrap();
    fs::write(config.weights_path(), "garbage").unwrap();
    fs::create_dir_all(config.policy_path().parent().unwrap()).unwrap();
    fs::write(config.policy_path(), "{").unwrap();

    let telemetry = Arc::new(TelemetryPipeline::start(config.telemetry()));
    let mut reactor = Reactor::with_seed(config.clone(), telemetry.clone(), 9);
    assert!(reactor.weights.is_empty());
    assert!(reactor.policy.is_empty());

    reactor.handle_line("fresh start");
    let weights: HashMap<String, u64> =
        serde_json::from_str(&fs::read_to_string(config.weights_path()).unwrap()).unwrap();
    assert_eq!(weights.get("fresh"), Some(&1));
    telemetry.close().await;
}

#[test]
fn test_config_defaults_and_toml() {
    let config = NeonConfig::default();
    assert_eq!(config.queue_capacity, 100);
    assert_eq!(config.heartbeat_secs, 30);
    assert_eq!(config.rule_candidates, 3);
    assert!(config.weights_path().ends_with("data/beliefs/weights.json"));
    assert!(config.policy_path().ends_with("data/policy/policy.json"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("neon.toml");
    fs::write(&path, "decay_rate = 0.2\nheartbeat_secs = 5\n").unwrap();
    let loaded = NeonConfig::from_file(&path).unwrap();
    assert_eq!(loaded.decay_rate, 0.2);
    assert_eq!(loaded.telemetry().heartbeat.as_secs(), 5);
    assert_eq!(loaded.queue_capacity, 100);
}

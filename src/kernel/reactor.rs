use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{Event, EventType};
use super::mood::{Mood, MoodEngine};
use super::telemetry::TelemetryPipeline;
use crate::config::NeonConfig;
use crate::error::AgentError;
use crate::memory::FrequencyStore;
use crate::outputs::Responder;
use crate::policy::{Rule, RuleEngine};

const PROMPT: &str = ">> ";
const EXIT_COMMAND: &str = "exit";

/// The interactive agent. Each input line flows
/// beliefs -> mood -> rule review -> response -> reflection,
/// with every observable transition sent to telemetry.
pub struct Reactor {
    config: NeonConfig,
    telemetry: Arc<TelemetryPipeline>,
    pub mood: MoodEngine,
    pub weights: Arc<FrequencyStore>,
    pub policy: RuleEngine,
    responder: Responder,
    // Mood under which each rule's text was last written
    rule_moods: HashMap<String, Mood>,
}

impl Reactor {
    pub fn new(config: NeonConfig, telemetry: Arc<TelemetryPipeline>) -> Self {
        Self::build(config, telemetry, None)
    }

    /// Same as [`new`](Self::new) with a deterministic responder.
    pub fn with_seed(config: NeonConfig, telemetry: Arc<TelemetryPipeline>, seed: u64) -> Self {
        Self::build(config, telemetry, Some(seed))
    }

    fn build(config: NeonConfig, telemetry: Arc<TelemetryPipeline>, seed: Option<u64>) -> Self {
        let weights = Arc::new(FrequencyStore::new());
        let weights_path = config.weights_path();
        if let Err(e) = weights.load(&weights_path) {
            warn!("starting with empty weights, {} unreadable: {}", weights_path.display(), e);
        }

        let policy_path = config.policy_path();
        let policy = RuleEngine::open(&policy_path).unwrap_or_else(|e| {
            warn!("starting with no rules, {} unreadable: {}", policy_path.display(), e);
            RuleEngine::new(&policy_path)
        });

        let responder = match seed {
            Some(s) => Responder::with_seed(weights.clone(), s),
            None => Responder::new(weights.clone()),
        };

        info!("reactor ready: {} known words, {} rules", weights.len(), policy.len());

        Self {
            mood: MoodEngine::new(config.decay_rate),
            config,
            telemetry,
            weights,
            policy,
            responder,
            rule_moods: HashMap::new(),
        }
    }

    pub fn config(&self) -> &NeonConfig {
        &self.config
    }

    /// Process one user line and return what should be shown to the user.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        let mut out = Vec::new();

        // 1. Beliefs
        self.weights.update(line);
        if let Err(e) = self.weights.save(&self.config.weights_path()) {
            warn!("weights save failed: {}", e);
            out.push(format!("⚠ failed to save weights: {}", e));
        }

        // 2. Mood
        let (mood, score) = self.mood.update_from_text(line);
        debug!("mood now {} ({:.2})", mood, score);

        // 3. Propose / edit rules for frequent words
        self.review_rules(mood, &mut out);

        self.telemetry.log(Event::new(
            EventType::Input,
            "console",
            json!({
                "text": line,
                "mood_now": mood,
                "mood_score": score,
                "top_words": self.weights.top_n(self.config.log_top_words),
            }),
        ));

        // 4. Response, possibly overridden by policy
        let mut response = self.responder.respond(line, mood);
        if let Some(text) = self.policy.apply(mood, line) {
            response = format!("({}) {}", mood, text);
        }
        self.telemetry.log(Event::new(
            EventType::Output,
            "agent",
            json!({ "text": response, "mood_now": mood, "mood_score": score }),
        ));
        out.push(response);

        // 5. Reflection
        if let Some(reflection) = self.responder.reflect_if_needed(line, mood, score) {
            self.telemetry.log(Event::new(
                EventType::Reflect,
                "agent",
                json!({ "text": reflection, "mood_now": mood, "mood_score": score }),
            ));
            out.push(reflection);
        }

        out
    }

    fn review_rules(&mut self, mood: Mood, out: &mut Vec<String>) {
        for wc in self.weights.top_n(self.config.rule_candidates) {
            let key = wc.word.to_lowercase();
            match self.policy.rule_for(&wc.word) {
                None => {
                    let rule = Rule::new(mood.as_str(), wc.word.as_str(), format!("I noticed the word '{}'.", wc.word));
                    self.policy.add_rule(rule.clone());
                    self.rule_moods.insert(key, mood);
                    self.save_policy(out);

                    self.telemetry.log(Event::new(
                        EventType::Propose,
                        "agent",
                        json!({ "word": wc.word, "mood": mood, "rule": rule, "count": wc.count }),
                    ));
                    out.push(format!("({}) I created a new rule for '{}'.", mood, wc.word));
                }
                Some(existing) => {
                    let last = self
                        .rule_moods
                        .get(&key)
                        .copied()
                        .or_else(|| existing.when.mood.parse().ok());
                    if last == Some(mood) {
                        continue;
                    }

                    let text = format!("Now I feel {} about '{}'.", mood, wc.word);
                    if self.policy.update_rule(&wc.word, &text) {
                        self.rule_moods.insert(key, mood);
                        self.save_policy(out);

                        self.telemetry.log(Event::new(
                            EventType::Edit,
                            "agent",
                            json!({ "word": wc.word, "mood": mood, "text": text, "count": wc.count }),
                        ));
                        out.push(format!("({}) I updated my rule for '{}'.", mood, wc.word));
                    }
                }
            }
        }
    }

    fn save_policy(&self, out: &mut Vec<String>) {
        if let Err(e) = self.policy.save() {
            warn!("policy save failed: {}", e);
            out.push(format!("⚠ failed to save policy: {}", e));
        }
    }

    /// Save weights and rules. Call before closing telemetry.
    pub fn persist(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Err(e) = self.weights.save(&self.config.weights_path()) {
            warn!("weights save failed: {}", e);
            out.push(format!("⚠ failed to save weights: {}", e));
        }
        self.save_policy(&mut out);
        out
    }

    /// EXIT event, final save, goodbye and health summary.
    pub fn shutdown(&self) -> Vec<String> {
        self.telemetry.log(Event::new(
            EventType::Exit,
            "console",
            json!({ "message": "User requested shutdown" }),
        ));

        let mut out = self.persist();
        out.push("Goodbye.".to_string());
        let h = self.telemetry.health();
        out.push(format!(
            "Health summary: uptime={}s, events={}, errors={}",
            h.uptime_sec, h.events, h.errors
        ));
        out
    }

    /// Conversation loop. Returns `Ok` on `exit` or end of input and
    /// `AgentError::Cancelled` once `cancel` fires. Persisting after a
    /// cancellation is the caller's job.
    pub async fn run<R, W>(&mut self, input: R, mut output: W, cancel: CancellationToken) -> Result<(), AgentError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.telemetry.log(Event::new(
            EventType::Boot,
            "system",
            json!({ "message": "NEON boot sequence" }),
        ));
        write_lines(&mut output, &["Type something (or 'exit' to quit):".to_string()]).await?;

        let mut lines = input.lines();
        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let next = tokio::select! {
                _ = cancel.cancelled() => return Err(AgentError::Cancelled),
                next = lines.next_line() => next?,
            };

            let Some(raw) = next else {
                info!("input closed, shutting down");
                write_lines(&mut output, &self.shutdown()).await?;
                return Ok(());
            };

            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line == EXIT_COMMAND {
                write_lines(&mut output, &self.shutdown()).await?;
                return Ok(());
            }

            let replies = self.handle_line(line);
            write_lines(&mut output, &replies).await?;
        }
    }
}

async fn write_lines<W: AsyncWrite + Unpin>(output: &mut W, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }
    output.flush().await
}

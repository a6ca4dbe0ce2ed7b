use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DECAY_RATE: f64 = 0.05;
pub const SCORE_LIMIT: f64 = 5.0;
pub const POSITIVE_THRESHOLD: f64 = 0.75;
pub const NEGATIVE_THRESHOLD: f64 = -0.75;

const VALENCE_STEP: f64 = 0.5;
const EXCLAMATION_BOOST: f64 = 0.25;
const QUESTION_DAMPING: f64 = 0.8;

const POSITIVE_WORDS: [&str; 14] = [
    "good", "great", "awesome", "love", "nice", "cool", "amazing", "yay",
    "thanks", "thank you", "excellent", "perfect", "happy", "success",
];

const NEGATIVE_WORDS: [&str; 14] = [
    "bad", "terrible", "awful", "hate", "annoying", "broken", "sad",
    "angry", "fail", "failure", "bug", "crash", "worse", "worst",
];

/// Coarse affective state derived from the continuous score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Mood {
    pub fn from_score(score: f64) -> Self {
        if score >= POSITIVE_THRESHOLD {
            Mood::Positive
        } else if score <= NEGATIVE_THRESHOLD {
            Mood::Negative
        } else {
            Mood::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Negative => "negative",
            Mood::Neutral => "neutral",
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Mood::Positive),
            "negative" => Ok(Mood::Negative),
            "neutral" => Ok(Mood::Neutral),
            other => Err(format!("unknown mood: {other}")),
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct MoodState {
    current: Mood,
    score: f64,
    last_update: DateTime<Utc>,
}

/// Keyword-valence mood tracker. The score drifts back toward zero at
/// `decay_rate` units per second between updates and never crosses zero
/// through decay alone.
#[derive(Debug)]
pub struct MoodEngine {
    decay_rate: f64,
    state: RwLock<MoodState>,
}

impl MoodEngine {
    /// Non-positive (or NaN) rates fall back to [`DEFAULT_DECAY_RATE`].
    pub fn new(decay_rate: f64) -> Self {
        Self::starting_at(decay_rate, Utc::now())
    }

    pub fn starting_at(decay_rate: f64, now: DateTime<Utc>) -> Self {
        let decay_rate = if decay_rate > 0.0 { decay_rate } else { DEFAULT_DECAY_RATE };
        Self {
            decay_rate,
            state: RwLock::new(MoodState {
                current: Mood::Neutral,
                score: 0.0,
                last_update: now,
            }),
        }
    }

    pub fn decay_rate(&self) -> f64 {
        self.decay_rate
    }

    pub fn get(&self) -> (Mood, f64) {
        let s = self.state.read();
        (s.current, s.score)
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.state.read().last_update
    }

    pub fn update_from_text(&self, text: &str) -> (Mood, f64) {
        self.update_from_text_at(text, Utc::now())
    }

    /// Decay, apply the text's valence, clamp, reclassify.
    pub fn update_from_text_at(&self, text: &str, now: DateTime<Utc>) -> (Mood, f64) {
        let delta = sentiment_delta(text);

        let mut s = self.state.write();
        // 1. Decay since the previous update
        s.score = decayed(s.score, self.decay_rate, elapsed_secs(s.last_update, now));
        // 2-3. Valence, clamped
        s.score = (s.score + delta).clamp(-SCORE_LIMIT, SCORE_LIMIT);
        // 4. Discrete class
        s.current = Mood::from_score(s.score);
        // 5. Timestamp
        if now > s.last_update {
            s.last_update = now;
        }
        (s.current, s.score)
    }

    /// Apply decay up to `now` without any new input.
    pub fn decay_at(&self, now: DateTime<Utc>) -> (Mood, f64) {
        self.update_from_text_at("", now)
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

fn decayed(score: f64, rate: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return score;
    }
    let pull = rate * dt;
    if score > 0.0 {
        (score - pull).max(0.0)
    } else if score < 0.0 {
        (score + pull).min(0.0)
    } else {
        score
    }
}

/// Valence of a single text chunk from the fixed keyword lists.
pub fn sentiment_delta(text: &str) -> f64 {
    let t = text.to_lowercase();

    let mut score = 0.0;
    for p in POSITIVE_WORDS {
        if t.contains(p) {
            score += VALENCE_STEP;
        }
    }
    for n in NEGATIVE_WORDS {
        if t.contains(n) {
            score -= VALENCE_STEP;
        }
    }

    if t.contains("!!!") {
        if score > 0.0 {
            score += EXCLAMATION_BOOST;
        } else if score < 0.0 {
            score -= EXCLAMATION_BOOST;
        }
    }
    // A complaint phrased as a question is softened
    if t.ends_with('?') && score < 0.0 {
        score *= QUESTION_DAMPING;
    }
    score
}

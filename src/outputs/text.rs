use crate::kernel::mood::Mood;
use crate::memory::{tokenize, FrequencyStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

const RESPONSE_POOL: usize = 5;
const REFLECTION_WORDS: usize = 3;
const EXTREME_SCORE: f64 = 2.0;

/// Builds the default reply and the occasional reflection from what the
/// agent has heard most. Rule overrides are applied by the caller.
#[derive(Debug)]
pub struct Responder {
    weights: Arc<FrequencyStore>,
    rng: StdRng,
    seen: HashSet<String>,
}

impl Responder {
    pub fn new(weights: Arc<FrequencyStore>) -> Self {
        Self::with_rng(weights, StdRng::from_entropy())
    }

    pub fn with_seed(weights: Arc<FrequencyStore>, seed: u64) -> Self {
        Self::with_rng(weights, StdRng::seed_from_u64(seed))
    }

    fn with_rng(weights: Arc<FrequencyStore>, rng: StdRng) -> Self {
        Self {
            weights,
            rng,
            seen: HashSet::new(),
        }
    }

    /// `(mood) I like <word>` with a word picked from the top five, or an
    /// echo of the input when nothing is known yet.
    pub fn respond(&mut self, user_text: &str, mood: Mood) -> String {
        let top = self.weights.top_n(RESPONSE_POOL);
        if top.is_empty() {
            return format!("({}) You said: {}", mood, user_text);
        }

        let base = match mood {
            Mood::Positive => "I like",
            Mood::Negative => "I don't like",
            Mood::Neutral => "I know",
        };
        let choice = &top[self.rng.gen_range(0..top.len())].word;
        format!("({}) {} {}", mood, base, choice)
    }

    /// Reflect when the text contains a never-seen word, sometimes when the
    /// mood is extreme, and otherwise with a one-in-six chance.
    pub fn reflect_if_needed(&mut self, user_text: &str, mood: Mood, score: f64) -> Option<String> {
        let mut trigger = false;
        for word in tokenize(user_text) {
            if self.seen.insert(word) {
                trigger = true;
            }
        }
        if score.abs() >= EXTREME_SCORE && self.rng.gen_bool(0.5) {
            trigger = true;
        }
        if self.rng.gen_range(0..6) == 0 {
            trigger = true;
        }
        if !trigger {
            return None;
        }

        let top = self.weights.top_n(REFLECTION_WORDS);
        if top.is_empty() {
            return Some(format!("({}) I don't know much yet.", mood));
        }
        let words: Vec<&str> = top.iter().map(|wc| wc.word.as_str()).collect();
        Some(format!("({}) I keep thinking about: {}", mood, words.join(", ")))
    }
}

use crate::kernel::mood::Mood;
use serde::{Deserialize, Serialize};

/// Rule trigger. An empty field is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub word: String,
}

/// If-then behaviour: when mood and word match, answer with `then`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub when: RuleCondition,
    pub then: String,
}

impl Rule {
    pub fn new(mood: impl Into<String>, word: impl Into<String>, then: impl Into<String>) -> Self {
        Self {
            when: RuleCondition {
                mood: mood.into(),
                word: word.into(),
            },
            then: then.into(),
        }
    }

    /// `input_lower` must already be lowercased.
    pub fn matches(&self, mood: Mood, input_lower: &str) -> bool {
        let mood_ok = self.when.mood.is_empty() || self.when.mood.eq_ignore_ascii_case(mood.as_str());
        let word_ok = self.when.word.is_empty() || input_lower.contains(&self.when.word.to_lowercase());
        mood_ok && word_ok
    }

    pub fn is_for_word(&self, word: &str) -> bool {
        self.when.word.to_lowercase() == word.to_lowercase()
    }
}

use serde::{Deserialize, Serialize};

/// A single ranked entry returned by [`FrequencyStore::top_n`](super::FrequencyStore::top_n).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

impl WordCount {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self { word: word.into(), count }
    }
}

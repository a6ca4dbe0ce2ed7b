use crate::error::StorageResult;
use crate::memory::persist::{atomic_write_json, read_json_if_exists};
use crate::memory::tokenizer::tokenize;
use crate::memory::types::WordCount;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Default)]
struct Counts {
    words: BTreeMap<String, u64>,
    dirty: bool,
}

/// Word -> occurrence count, shared between the interactive loop and anything
/// reading beliefs. Mutation takes the write lock; queries take the read lock.
///
/// Invariant: `save` touches the filesystem only when an `update` happened
/// since the last successful save or load.
#[derive(Debug, Default)]
pub struct FrequencyStore {
    inner: RwLock<Counts>,
}

impl FrequencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing counts. The result is considered dirty.
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let words = counts.into_iter().map(|(w, c)| (w.into(), c)).collect();
        Self {
            inner: RwLock::new(Counts { words, dirty: true }),
        }
    }

    /// Tokenize `text` and bump every token's count.
    pub fn update(&self, text: &str) {
        let tokens = tokenize(text);
        let mut inner = self.inner.write();
        for tok in tokens {
            *inner.words.entry(tok).or_insert(0) += 1;
        }
        inner.dirty = true;
    }

    /// Highest counts first; equal counts ordered by word.
    /// `n == 0` returns every entry.
    pub fn top_n(&self, n: usize) -> Vec<WordCount> {
        let inner = self.inner.read();
        let mut pairs: Vec<WordCount> = inner
            .words
            .iter()
            .map(|(w, c)| WordCount::new(w.clone(), *c))
            .collect();
        drop(inner);

        pairs.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
        if n > 0 && n < pairs.len() {
            pairs.truncate(n);
        }
        pairs
    }

    pub fn count(&self, word: &str) -> u64 {
        self.inner.read().words.get(word).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.inner.read().words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().words.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty
    }

    /// Copy of the current counts.
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.inner
            .read()
            .words
            .iter()
            .map(|(w, c)| (w.clone(), *c))
            .collect()
    }

    /// Counts exported as float weights (snapshot `weights` field).
    pub fn weights(&self) -> HashMap<String, f64> {
        self.inner
            .read()
            .words
            .iter()
            .map(|(w, c)| (w.clone(), *c as f64))
            .collect()
    }

    /// Atomically persist the counts if anything changed since the last save.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        // Held for the whole write so a concurrent update can't be marked clean.
        let mut inner = self.inner.write();
        if !inner.dirty {
            return Ok(());
        }
        atomic_write_json(path, &inner.words)?;
        inner.dirty = false;
        tracing::debug!("saved {} word counts to {}", inner.words.len(), path.display());
        Ok(())
    }

    /// Replace the in-memory counts with the file's contents.
    /// A missing file means an empty store; a malformed one is an error and
    /// leaves the current counts untouched.
    pub fn load(&self, path: &Path) -> StorageResult<()> {
        let words: BTreeMap<String, u64> = read_json_if_exists(path)?.unwrap_or_default();
        let mut inner = self.inner.write();
        inner.words = words;
        inner.dirty = false;
        Ok(())
    }
}

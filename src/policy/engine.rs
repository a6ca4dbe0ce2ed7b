use super::types::Rule;
use crate::error::StorageResult;
use crate::kernel::mood::Mood;
use crate::memory::persist::{atomic_write_json, read_json_if_exists};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct RuleSet {
    rules: Vec<Rule>,
    dirty: bool,
}

/// Ordered rule list with first-match evaluation.
///
/// Rules are append-only in priority: earlier rules shadow later ones whose
/// conditions overlap.
#[derive(Debug)]
pub struct RuleEngine {
    path: PathBuf,
    inner: RwLock<RuleSet>,
}

impl RuleEngine {
    /// Empty engine persisting to `path`. Nothing is read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(RuleSet::default()),
        }
    }

    /// Engine loaded from `path` (empty if the file does not exist).
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let engine = Self::new(path);
        engine.load()?;
        Ok(engine)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First rule matching `mood` and `input`, in insertion order.
    pub fn apply(&self, mood: Mood, input: &str) -> Option<String> {
        let input = input.to_lowercase();
        self.inner
            .read()
            .rules
            .iter()
            .find(|r| r.matches(mood, &input))
            .map(|r| r.then.clone())
    }

    pub fn has_rule_for(&self, word: &str) -> bool {
        self.inner.read().rules.iter().any(|r| r.is_for_word(word))
    }

    pub fn rule_for(&self, word: &str) -> Option<Rule> {
        self.inner.read().rules.iter().find(|r| r.is_for_word(word)).cloned()
    }

    /// Append at the lowest priority.
    pub fn add_rule(&self, rule: Rule) {
        let mut inner = self.inner.write();
        inner.rules.push(rule);
        inner.dirty = true;
    }

    /// Replace the template of the first rule keyed on `word`.
    /// Returns false when no rule matches.
    pub fn update_rule(&self, word: &str, new_text: &str) -> bool {
        let mut inner = self.inner.write();
        match inner.rules.iter_mut().find(|r| r.is_for_word(word)) {
            Some(rule) => {
                rule.then = new_text.to_string();
                inner.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.inner.read().rules.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().rules.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.read().dirty
    }

    /// Atomically persist the rule list if it changed since the last save.
    pub fn save(&self) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if !inner.dirty {
            return Ok(());
        }
        atomic_write_json(&self.path, &inner.rules)?;
        inner.dirty = false;
        tracing::debug!("saved {} rules to {}", inner.rules.len(), self.path.display());
        Ok(())
    }

    /// Replace the rule list from disk. Missing file -> empty list;
    /// malformed file -> error with the current rules kept.
    pub fn load(&self) -> StorageResult<()> {
        let rules: Vec<Rule> = read_json_if_exists(&self.path)?.unwrap_or_default();
        let mut inner = self.inner.write();
        inner.rules = rules;
        inner.dirty = false;
        Ok(())
    }
}

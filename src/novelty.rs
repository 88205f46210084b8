//! Novelty guard: rejects a candidate question that overlaps too much with one
//! of the recently asked questions.
//!
//! History is an explicit bounded window handed in by the caller. Scoring
//! problems never block a question: they yield [`NoveltyVerdict::FailedOpen`].

use std::collections::VecDeque;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::concepts::{extract_concepts, similarity};

pub const DEFAULT_THRESHOLD: f64 = 0.75;
pub const DEFAULT_WINDOW: usize = 10;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoveltyConfig {
  /// Scores strictly above this are duplicates.
  pub threshold: f64,
  /// How many of the most recent questions are compared.
  pub window: usize,
}

impl Default for NoveltyConfig {
  fn default() -> Self {
    Self { threshold: DEFAULT_THRESHOLD, window: DEFAULT_WINDOW }
  }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NoveltyError {
  #[error("similarity threshold {0} is outside [0, 1]")]
  InvalidThreshold(f64),

  #[error("non-finite similarity score against \"{0}\"")]
  NonFiniteScore(String),
}

/// Most-recent-last window of previously asked question texts.
#[derive(Clone, Debug)]
pub struct QuestionHistory {
  capacity: usize,
  entries: VecDeque<String>,
}

impl QuestionHistory {
  pub fn new(capacity: usize) -> Self {
    Self { capacity, entries: VecDeque::with_capacity(capacity) }
  }

  /// Build from a comma/newline-joined blob, keeping only the last `capacity` entries.
  pub fn from_blob(blob: &str, capacity: usize) -> Self {
    let mut history = Self::new(capacity);
    blob
      .split([',', '\n'])
      .map(str::trim)
      .filter(|q| !q.is_empty())
      .for_each(|q| history.push(q));
    history
  }

  /// Append a question, evicting the oldest one when full.
  pub fn push(&mut self, question: impl Into<String>) {
    if self.capacity == 0 {
      return;
    }
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(question.into());
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, question: &str) -> bool {
    self.entries.iter().any(|q| q == question)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
    self.entries.iter().map(String::as_str)
  }

  /// Newline-joined form, suitable for an "avoid these" prompt clause.
  pub fn to_blob(&self) -> String {
    self.entries.iter().cloned().collect::<Vec<_>>().join("\n")
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NoveltyVerdict {
  Novel,
  Duplicate { similarity: f64, matched: String },
  /// Scoring failed; the candidate is let through.
  FailedOpen { reason: String },
}

impl NoveltyVerdict {
  #[allow(dead_code)]
  pub fn is_duplicate(&self) -> bool {
    matches!(self, NoveltyVerdict::Duplicate { .. })
  }
}

#[derive(Clone, Debug, Default)]
pub struct NoveltyGuard {
  config: NoveltyConfig,
}

impl NoveltyGuard {
  pub fn new(config: NoveltyConfig) -> Self {
    Self { config }
  }

  /// Compare `candidate` against the tail of `history`; stops at the first duplicate.
  #[instrument(level = "debug", skip(self, candidate, history), fields(history_len = history.len()))]
  pub fn check(&self, candidate: &str, history: &QuestionHistory) -> NoveltyVerdict {
    match self.try_check(candidate, history) {
      Ok(verdict) => verdict,
      Err(e) => {
        warn!(target: "novelty", error = %e, "Novelty check failed; accepting question");
        NoveltyVerdict::FailedOpen { reason: e.to_string() }
      }
    }
  }

  #[allow(dead_code)]
  pub fn is_similar(&self, candidate: &str, history: &QuestionHistory) -> bool {
    self.check(candidate, history).is_duplicate()
  }

  fn try_check(&self, candidate: &str, history: &QuestionHistory) -> Result<NoveltyVerdict, NoveltyError> {
    let threshold = self.config.threshold;
    if !(0.0..=1.0).contains(&threshold) {
      return Err(NoveltyError::InvalidThreshold(threshold));
    }
    if history.is_empty() {
      debug!(target: "novelty", "No previous questions; accepting");
      return Ok(NoveltyVerdict::Novel);
    }

    let skip = history.len().saturating_sub(self.config.window);
    let candidate_concepts = extract_concepts(candidate);

    for previous in history.iter().skip(skip) {
      let score = similarity(&candidate_concepts, &extract_concepts(previous));
      if !score.is_finite() {
        return Err(NoveltyError::NonFiniteScore(previous.to_string()));
      }
      if score > threshold {
        info!(target: "novelty", similarity = score, similar_to = %previous, "Question rejected as duplicate");
        return Ok(NoveltyVerdict::Duplicate { similarity: score, matched: previous.to_string() });
      }
    }

    Ok(NoveltyVerdict::Novel)
  }
}

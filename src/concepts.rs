//! Concept extraction and set-overlap scoring for question texts.
//!
//! A question is reduced to a set of salient lowercase terms plus any
//! single-quoted literals taken verbatim from the original text. Two sets are
//! compared with a Jaccard ratio damped by how unequal their sizes are.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub type ConceptSet = HashSet<String>;

/// Characters removed before tokenizing.
const STRIPPED_PUNCTUATION: &[char] = &[
  '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~', '(', ')',
];

const STOPWORDS: &[&str] = &[
  "this", "that", "these", "those", "with", "from", "into", "code", "when", "what", "where", "which", "why",
  "how", "does", "will", "should", "would", "could", "than", "then", "have", "has", "had",
];

static LEADING_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(
    r"^(what|how|why|which|when|where|explain|describe|identify)\s+(is|are|does|do|would|will|can|should)\s+",
  )
  .expect("leading question pattern")
});

static LEADING_ARTICLE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^(the|a|an)\s+").expect("leading article pattern"));

static GENERIC_NOUNS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\b(code|following|given|example|output|result)\b").expect("generic noun pattern")
});

static QUOTED_LITERAL: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"'([^']+)'").expect("quoted literal pattern"));

/// Lowercase, drop the fixed punctuation set and collapse whitespace runs.
fn normalize(text: &str) -> String {
  let lowered: String = text
    .to_lowercase()
    .chars()
    .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
    .collect();
  lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the concept set of a question.
pub fn extract_concepts(text: &str) -> ConceptSet {
  let normalized = normalize(text);
  let without_lead = LEADING_QUESTION.replace(&normalized, "");
  let without_article = LEADING_ARTICLE.replace(&without_lead, "");
  let cleaned = GENERIC_NOUNS.replace_all(&without_article, "");

  let mut concepts: ConceptSet = cleaned
    .split(' ')
    .filter(|w| w.chars().count() > 3 && !STOPWORDS.contains(w))
    .map(str::to_string)
    .collect();

  // Literals are read from the raw text so identifiers keep their case and punctuation.
  concepts.extend(
    QUOTED_LITERAL
      .captures_iter(text)
      .filter_map(|c| c.get(1))
      .map(|m| m.as_str().to_string()),
  );

  concepts
}

/// Jaccard overlap of two concept sets, scaled down by their size imbalance.
/// Returns a value in `[0, 1]`; 0 when either set is empty.
pub fn similarity(a: &ConceptSet, b: &ConceptSet) -> f64 {
  if a.is_empty() || b.is_empty() {
    return 0.0;
  }
  let intersection = a.intersection(b).count() as f64;
  let union = a.union(b).count() as f64;
  let jaccard = intersection / union;

  let (la, lb) = (a.len() as f64, b.len() as f64);
  let imbalance = (la - lb).abs() / la.max(lb);

  jaccard * (1.0 - imbalance)
}

//! Schema validation of generated questions.
//!
//! Takes the loosely-typed JSON a model produced and either returns a
//! canonical [`Question`] or the first contract violation found. Checks run in
//! a fixed order and the first failure wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::domain::{Question, Topic};
use crate::novelty::{NoveltyGuard, NoveltyVerdict, QuestionHistory};

/// `// ` comments run to end of line; whitespace before them goes too.
static LINE_COMMENT: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?m)[ \t]*// .*$").expect("line comment pattern"));

/// Which contract a question is validated against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QuizMode {
  /// Generated one at a time for a whitelisted topic: exactly 4 options.
  #[default]
  Standard,
  /// Generated in batches from review text: 3 or 4 options, free-form topic.
  Custom,
}

impl QuizMode {
  fn accepts_option_count(self, n: usize) -> bool {
    match self {
      QuizMode::Standard => n == 4,
      QuizMode::Custom => (3..=4).contains(&n),
    }
  }

  fn option_count_rule(self) -> &'static str {
    match self {
      QuizMode::Standard => "exactly 4",
      QuizMode::Custom => "3 to 4",
    }
  }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
  #[error("Invalid question data format")]
  InvalidFormat,

  #[error("Missing or invalid question field")]
  MissingQuestion,

  #[error("Missing or invalid options array")]
  MissingOptions,

  #[error("Options must contain {expected} items, got {actual}")]
  OptionCount { expected: &'static str, actual: usize },

  #[error("Question is too similar to previous questions (similarity {similarity:.2} with \"{matched}\")")]
  TooSimilar { similarity: f64, matched: String },

  #[error("All options must be strings (option {index} is not)")]
  NonStringOption { index: usize },

  #[error("Missing or invalid correctAnswer field")]
  MissingCorrectAnswer,

  #[error("Correct answer {answer:?} must exactly match one of the options: {options:?}")]
  AnswerMismatch { answer: String, options: Vec<String> },

  #[error("Code must be a string if provided")]
  InvalidCode,

  #[error("Missing or invalid topic field")]
  MissingTopic,

  #[error("Invalid topic: {value}. Must be one of: {allowed}")]
  InvalidTopic { value: String, allowed: String },

  #[error("{field} must be a string if provided")]
  InvalidText { field: &'static str },
}

impl ValidationError {
  /// Duplicates are well-formed; the caller should ask the generator again.
  pub fn is_duplicate(&self) -> bool {
    matches!(self, ValidationError::TooSimilar { .. })
  }
}

#[derive(Clone, Debug, Default)]
pub struct QuestionValidator {
  guard: NoveltyGuard,
}

impl QuestionValidator {
  pub fn new(guard: NoveltyGuard) -> Self {
    Self { guard }
  }

  /// Validate `raw` into a canonical question.
  ///
  /// `history`, when given and non-empty, is used to reject near-duplicates.
  #[instrument(level = "debug", skip(self, raw, history), fields(history_len = ?history.map(|h| h.len())))]
  pub fn validate(
    &self,
    raw: &Value,
    history: Option<&QuestionHistory>,
    mode: QuizMode,
  ) -> Result<Question, ValidationError> {
    let obj = raw.as_object().ok_or(ValidationError::InvalidFormat)?;

    let question = obj
      .get("question")
      .and_then(Value::as_str)
      .ok_or(ValidationError::MissingQuestion)?;

    let raw_options = obj
      .get("options")
      .and_then(Value::as_array)
      .ok_or(ValidationError::MissingOptions)?;
    if !mode.accepts_option_count(raw_options.len()) {
      return Err(ValidationError::OptionCount {
        expected: mode.option_count_rule(),
        actual: raw_options.len(),
      });
    }

    if let Some(history) = history.filter(|h| !h.is_empty()) {
      match self.guard.check(question, history) {
        NoveltyVerdict::Duplicate { similarity, matched } => {
          return Err(ValidationError::TooSimilar { similarity, matched });
        }
        NoveltyVerdict::FailedOpen { reason } => {
          debug!(target: "question", %reason, "Novelty check skipped");
        }
        NoveltyVerdict::Novel => {}
      }
    }

    let options = raw_options
      .iter()
      .enumerate()
      .map(|(index, opt)| {
        opt
          .as_str()
          .map(|s| s.trim().to_string())
          .ok_or(ValidationError::NonStringOption { index })
      })
      .collect::<Result<Vec<_>, _>>()?;

    let answer = obj
      .get("correctAnswer")
      .and_then(Value::as_str)
      .ok_or(ValidationError::MissingCorrectAnswer)?
      .trim();
    let Some(correct_index) = options.iter().position(|opt| opt == answer) else {
      error!(target: "question", ?options, ?answer, "Correct answer does not match any option");
      return Err(ValidationError::AnswerMismatch { answer: answer.to_string(), options });
    };

    let code = clean_code(obj.get("code"))?;

    let topic = match mode {
      QuizMode::Standard => resolve_topic(obj)?.as_str().to_string(),
      QuizMode::Custom => text_field(obj, "topic")?,
    };

    let explanation = text_field(obj, "explanation")?;
    let difficulty = text_field(obj, "difficulty")?;
    let correct_answer = options[correct_index].clone();

    Ok(Question {
      question: question.to_string(),
      code,
      options,
      correct_answer,
      explanation,
      topic,
      difficulty,
    })
  }
}

/// Strip `// ` comments; an empty result becomes `None`.
fn clean_code(value: Option<&Value>) -> Result<Option<String>, ValidationError> {
  match value {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(code)) => {
      let stripped = LINE_COMMENT.replace_all(code, "");
      let trimmed = stripped.trim();
      Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
    Some(_) => Err(ValidationError::InvalidCode),
  }
}

/// Topic before the first comma, which must be whitelisted.
fn resolve_topic(obj: &Map<String, Value>) -> Result<Topic, ValidationError> {
  let raw = obj
    .get("topic")
    .and_then(Value::as_str)
    .ok_or(ValidationError::MissingTopic)?;
  let first = raw.split(',').next().unwrap_or_default().trim();
  first.parse::<Topic>().map_err(|_| ValidationError::InvalidTopic {
    value: first.to_string(),
    allowed: Topic::whitelist(),
  })
}

/// Pass-through text: missing or null is empty, other non-strings are rejected.
fn text_field(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
  match obj.get(field) {
    None | Some(Value::Null) => Ok(String::new()),
    Some(Value::String(s)) => Ok(s.clone()),
    Some(_) => Err(ValidationError::InvalidText { field }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn valid() -> Value {
    json!({
      "question": "What does typeof null return?",
      "code": "console.log(typeof null);",
      "options": ["\"object\"", "\"null\"", "\"undefined\"", "\"number\""],
      "correctAnswer": "\"object\"",
      "explanation": "A long-standing quirk of the language.",
      "topic": "data-types",
      "difficulty": "easy"
    })
  }

  fn validate(raw: &Value, mode: QuizMode) -> Result<Question, ValidationError> {
    QuestionValidator::default().validate(raw, None, mode)
  }

  #[test]
  fn accepts_a_well_formed_question() {
    let q = validate(&valid(), QuizMode::Standard).expect("valid");
    assert_eq!(q.question, "What does typeof null return?");
    assert_eq!(q.correct_answer, "\"object\"");
    assert_eq!(q.topic, "data-types");
    assert_eq!(q.difficulty, "easy");
    assert_eq!(q.code.as_deref(), Some("console.log(typeof null);"));
  }

  #[test]
  fn validating_a_validated_question_is_idempotent() {
    let first = validate(&valid(), QuizMode::Standard).expect("valid");
    let again = validate(&serde_json::to_value(&first).expect("to value"), QuizMode::Standard).expect("valid");
    assert_eq!(first, again);
  }

  #[test]
  fn rejects_non_objects() {
    assert_eq!(validate(&json!(null), QuizMode::Standard), Err(ValidationError::InvalidFormat));
    assert_eq!(validate(&json!([1, 2]), QuizMode::Standard), Err(ValidationError::InvalidFormat));
  }

  #[test]
  fn rejects_missing_question_and_options() {
    let mut raw = valid();
    raw["question"] = json!(42);
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::MissingQuestion));

    let mut raw = valid();
    raw.as_object_mut().expect("object").remove("options");
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::MissingOptions));
  }

  #[test]
  fn standard_mode_requires_exactly_four_options() {
    for n in [3usize, 5] {
      let mut raw = valid();
      raw["options"] = json!((0..n).map(|i| format!("opt {i}")).collect::<Vec<_>>());
      raw["correctAnswer"] = json!("opt 0");
      assert_eq!(
        validate(&raw, QuizMode::Standard),
        Err(ValidationError::OptionCount { expected: "exactly 4", actual: n })
      );
    }
  }

  #[test]
  fn custom_mode_accepts_three_or_four_options() {
    for n in [3usize, 4] {
      let mut raw = valid();
      raw["options"] = json!((0..n).map(|i| format!("opt {i}")).collect::<Vec<_>>());
      raw["correctAnswer"] = json!("opt 1");
      let q = validate(&raw, QuizMode::Custom).expect("custom count ok");
      assert_eq!(q.options.len(), n);
    }
    for n in [2usize, 5] {
      let mut raw = valid();
      raw["options"] = json!((0..n).map(|i| format!("opt {i}")).collect::<Vec<_>>());
      raw["correctAnswer"] = json!("opt 1");
      assert!(matches!(
        validate(&raw, QuizMode::Custom),
        Err(ValidationError::OptionCount { actual, .. }) if actual == n
      ));
    }
  }

  #[test]
  fn options_are_trimmed_but_prefixes_are_kept() {
    let mut raw = valid();
    raw["options"] = json!(["  A) one ", "B) two", "C) three", "D) four"]);
    raw["correctAnswer"] = json!(" A) one");
    let q = validate(&raw, QuizMode::Standard).expect("valid");
    assert_eq!(q.options[0], "A) one");
    assert_eq!(q.correct_answer, "A) one");
  }

  #[test]
  fn non_string_option_is_rejected() {
    let mut raw = valid();
    raw["options"] = json!(["a", "b", 3, "d"]);
    raw["correctAnswer"] = json!("a");
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::NonStringOption { index: 2 }));
  }

  #[test]
  fn answer_must_match_an_option_exactly() {
    let mut raw = valid();
    raw["correctAnswer"] = json!("\"OBJECT\"");
    match validate(&raw, QuizMode::Standard) {
      Err(ValidationError::AnswerMismatch { answer, options }) => {
        assert_eq!(answer, "\"OBJECT\"");
        assert_eq!(options.len(), 4);
      }
      other => panic!("expected mismatch, got {other:?}"),
    }

    let mut raw = valid();
    raw.as_object_mut().expect("object").remove("correctAnswer");
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::MissingCorrectAnswer));
  }

  #[test]
  fn validated_answer_is_always_one_of_the_options() {
    let mut raw = valid();
    raw["correctAnswer"] = json!("  \"null\"  ");
    let q = validate(&raw, QuizMode::Standard).expect("valid");
    assert!(q.options.contains(&q.correct_answer));
    assert_eq!(q.correct_answer, "\"null\"");
  }

  #[test]
  fn trailing_comments_are_stripped_from_code() {
    let mut raw = valid();
    raw["code"] = json!("let x = 1; // comment\nlet y = 2;");
    let q = validate(&raw, QuizMode::Standard).expect("valid");
    assert_eq!(q.code.as_deref(), Some("let x = 1;\nlet y = 2;"));
  }

  #[test]
  fn urls_inside_code_survive_comment_stripping() {
    let mut raw = valid();
    raw["code"] = json!("fetch('https://example.com/api');");
    let q = validate(&raw, QuizMode::Standard).expect("valid");
    assert_eq!(q.code.as_deref(), Some("fetch('https://example.com/api');"));
  }

  #[test]
  fn comment_only_or_empty_code_becomes_none() {
    for code in [json!("// just a comment"), json!(""), json!(null)] {
      let mut raw = valid();
      raw["code"] = code;
      assert_eq!(validate(&raw, QuizMode::Standard).expect("valid").code, None);
    }
    let mut raw = valid();
    raw["code"] = json!(["not", "a", "string"]);
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::InvalidCode));
  }

  #[test]
  fn topic_is_whitelisted_in_standard_mode_only() {
    let mut raw = valid();
    raw["topic"] = json!("error-handling");
    match validate(&raw, QuizMode::Standard) {
      Err(ValidationError::InvalidTopic { value, allowed }) => {
        assert_eq!(value, "error-handling");
        assert!(allowed.contains("this-keyword"));
      }
      other => panic!("expected invalid topic, got {other:?}"),
    }
    let q = validate(&raw, QuizMode::Custom).expect("custom accepts any topic");
    assert_eq!(q.topic, "error-handling");
  }

  #[test]
  fn topic_uses_the_part_before_the_first_comma() {
    let mut raw = valid();
    raw["topic"] = json!(" closures , scope");
    assert_eq!(validate(&raw, QuizMode::Standard).expect("valid").topic, "closures");
  }

  #[test]
  fn missing_topic_fails_in_standard_mode() {
    let mut raw = valid();
    raw.as_object_mut().expect("object").remove("topic");
    assert_eq!(validate(&raw, QuizMode::Standard), Err(ValidationError::MissingTopic));
    assert_eq!(validate(&raw, QuizMode::Custom).expect("custom").topic, "");
  }

  #[test]
  fn explanation_must_be_text_when_present() {
    let mut raw = valid();
    raw["explanation"] = json!({ "nested": true });
    assert_eq!(
      validate(&raw, QuizMode::Standard),
      Err(ValidationError::InvalidText { field: "explanation" })
    );
  }

  #[test]
  fn duplicate_is_rejected_before_option_checks() {
    let validator = QuestionValidator::default();
    let history = QuestionHistory::from_blob("What does typeof null return?", 10);
    let mut raw = valid();
    raw["options"] = json!(["a", "b", 3, "d"]);
    let err = validator.validate(&raw, Some(&history), QuizMode::Standard).expect_err("duplicate");
    assert!(err.is_duplicate());
    assert!(err.to_string().starts_with("Question is too similar"));
  }

  #[test]
  fn option_count_is_checked_before_novelty() {
    let validator = QuestionValidator::default();
    let history = QuestionHistory::from_blob("What does typeof null return?", 10);
    let mut raw = valid();
    raw["options"] = json!(["a", "b"]);
    assert!(matches!(
      validator.validate(&raw, Some(&history), QuizMode::Standard),
      Err(ValidationError::OptionCount { actual: 2, .. })
    ));
  }
}

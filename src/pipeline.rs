//! Raw model text to canonical questions: repair, parse, validate.

use serde_json::Value;
use tracing::{info, instrument};

use crate::domain::Question;
use crate::error::{QuizError, Result};
use crate::novelty::QuestionHistory;
use crate::repair::parse_model_json;
use crate::validate::{QuestionValidator, QuizMode};

/// One generated question, checked against `history` for repeats.
#[instrument(level = "debug", skip(validator, raw, history), fields(raw_len = raw.len()))]
pub fn question_from_response(
  validator: &QuestionValidator,
  raw: &str,
  history: Option<&QuestionHistory>,
  mode: QuizMode,
) -> Result<Question> {
  let value = parse_model_json(raw)?;
  let question = validator.validate(&value, history, mode)?;
  info!(target: "question", topic = %question.topic, options = question.options.len(), "Validated question");
  Ok(question)
}

/// A `{"questions": [...]}` batch; every item is validated in custom mode and
/// the first invalid item fails the whole batch.
#[instrument(level = "debug", skip(validator, raw), fields(raw_len = raw.len()))]
pub fn custom_quiz_from_response(validator: &QuestionValidator, raw: &str) -> Result<Vec<Question>> {
  let value = parse_model_json(raw)?;
  let items = value
    .get("questions")
    .and_then(Value::as_array)
    .ok_or(QuizError::MissingQuestionArray)?;

  let questions = items
    .iter()
    .enumerate()
    .map(|(index, item)| {
      validator
        .validate(item, None, QuizMode::Custom)
        .map_err(|source| QuizError::CustomQuestion { index, source })
    })
    .collect::<Result<Vec<_>>>()?;

  info!(target: "question", count = questions.len(), "Validated custom quiz");
  Ok(questions)
}

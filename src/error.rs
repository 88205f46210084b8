use thiserror::Error;

use crate::generator::GeneratorError;
use crate::repair::RepairError;
use crate::validate::ValidationError;

pub type Result<T> = std::result::Result<T, QuizError>;

#[derive(Debug, Error)]
pub enum QuizError {
  #[error(transparent)]
  Repair(#[from] RepairError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("Question {index}: {source}")]
  CustomQuestion { index: usize, source: ValidationError },

  #[error("Response must contain an array of questions")]
  MissingQuestionArray,

  #[error("Generator error: {0}")]
  Generator(#[from] GeneratorError),

  #[error("Generator not configured (set MISTRAL_API_KEY)")]
  GeneratorUnavailable,

  #[error("No usable question after {attempts} attempts: {last}")]
  Exhausted { attempts: usize, last: Box<QuizError> },

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

impl QuizError {
  /// True when the response was well-formed but repeated an earlier question.
  pub fn is_duplicate(&self) -> bool {
    matches!(self, QuizError::Validation(v) if v.is_duplicate())
  }
}

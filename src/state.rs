//! Application state: configuration, validator, optional generator client and
//! question selection.
//!
//! Selection policy: ask the generator (retrying on duplicates and malformed
//! output); when it is unavailable or keeps failing, serve a built-in seed
//! question the session has not seen yet.

use rand::seq::SliceRandom;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{load_config_from_env, AppConfig};
use crate::domain::{Difficulty, Question, Topic};
use crate::error::{QuizError, Result};
use crate::generator::{ChatClient, Completion, GeneratorError, Sampling};
use crate::novelty::{NoveltyGuard, QuestionHistory};
use crate::pipeline::{custom_quiz_from_response, question_from_response};
use crate::prompt::{custom_prompt, next_topic, question_prompt};
use crate::review::parse_review_comments;
use crate::seeds::seed_questions;
use crate::session::QuizSession;
use crate::util::trunc_for_log;
use crate::validate::{QuestionValidator, QuizMode};

pub struct AppState {
  pub config: AppConfig,
  pub validator: QuestionValidator,
  pub generator: Option<ChatClient>,
}

impl AppState {
  /// Build state from env: load config, build the validator, init the generator client.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let config = load_config_from_env().unwrap_or_default();
    let generator = ChatClient::from_env(&config.generation);
    if let Some(g) = &generator {
      info!(target: "jsquiz", base_url = %g.base_url, model = %g.model, "Question generator enabled.");
    } else {
      info!(target: "jsquiz", "Question generator disabled (no MISTRAL_API_KEY). Using seed questions.");
    }
    Self::with_parts(config, generator)
  }

  pub fn with_parts(config: AppConfig, generator: Option<ChatClient>) -> Self {
    let validator = QuestionValidator::new(NoveltyGuard::new(config.novelty.clone()));
    Self { config, validator, generator }
  }

  pub fn history_window(&self) -> usize {
    self.config.novelty.window
  }

  /// Generate one standard question, re-asking when the answer is unusable.
  /// Rate limiting stops the attempts immediately.
  #[instrument(level = "info", skip(self, history), fields(%topic, %difficulty, history_len = history.len()))]
  pub async fn generate_question(
    &self,
    topic: Topic,
    difficulty: Difficulty,
    history: &QuestionHistory,
  ) -> Result<Question> {
    let client = self.generator.as_ref().ok_or(QuizError::GeneratorUnavailable)?;
    self.generate_with(client, topic, difficulty, history).await
  }

  async fn generate_with<C: Completion>(
    &self,
    client: &C,
    topic: Topic,
    difficulty: Difficulty,
    history: &QuestionHistory,
  ) -> Result<Question> {
    let settings = &self.config.generation;
    let attempts = settings.max_attempts.max(1);
    let mut last: Option<QuizError> = None;

    for attempt in 1..=attempts {
      let prompt = question_prompt(&self.config.prompts, topic, difficulty, history, &mut rand::thread_rng());
      let raw = match client
        .complete(&self.config.prompts.question_system, &prompt, Sampling::question(settings))
        .await
      {
        Ok(raw) => raw,
        Err(e @ GeneratorError::RateLimited { .. }) => return Err(e.into()),
        Err(e) => {
          warn!(target: "question", attempt, error = %e, "Generator call failed");
          last = Some(e.into());
          continue;
        }
      };
      debug!(target: "question", attempt, raw = %trunc_for_log(&raw, 300), "Model output");

      match question_from_response(&self.validator, &raw, Some(history), QuizMode::Standard) {
        Ok(q) => return Ok(q),
        Err(e) => {
          warn!(target: "question", attempt, duplicate = e.is_duplicate(), error = %e, "Generated question rejected");
          last = Some(e);
        }
      }
    }

    Err(QuizError::Exhausted {
      attempts,
      last: Box::new(last.unwrap_or(QuizError::GeneratorUnavailable)),
    })
  }

  /// Next question for an interactive session, with the seed fallback.
  #[instrument(level = "info", skip(self, session), fields(session = %session.id, difficulty = %session.difficulty))]
  pub async fn choose_question(&self, session: &QuizSession) -> Result<(Question, &'static str)> {
    let topic = next_topic(session.difficulty, &mut rand::thread_rng());
    match self.generate_question(topic, session.difficulty, &session.history).await {
      Ok(q) => return Ok((q, "generated")),
      Err(QuizError::GeneratorUnavailable) => {}
      Err(e) => error!(target: "question", error = %e, "Generation failed; falling back to seeds"),
    }

    let q = fallback_question(session.difficulty, &session.history).ok_or(QuizError::GeneratorUnavailable)?;
    warn!(target: "question", topic = %q.topic, "Serving seed question");
    Ok((q, "seed"))
  }

  /// Generate a custom quiz from a pasted code-review export.
  #[instrument(level = "info", skip(self, review_text), fields(review_len = review_text.len(), %difficulty))]
  pub async fn custom_quiz(&self, review_text: &str, difficulty: Difficulty) -> Result<Vec<Question>> {
    let comments = parse_review_comments(review_text);
    if comments.is_empty() {
      return Err(QuizError::BadRequest("no \"Comment:\" lines found in review data".into()));
    }
    let client = self.generator.as_ref().ok_or(QuizError::GeneratorUnavailable)?;

    let prompt = custom_prompt(&self.config.prompts, &comments, difficulty);
    let raw = client
      .complete(&self.config.prompts.custom_system, &prompt, Sampling::custom(&self.config.generation))
      .await?;
    debug!(target: "question", raw = %trunc_for_log(&raw, 300), "Custom quiz model output");

    let questions = custom_quiz_from_response(&self.validator, &raw)?;
    info!(target: "question", comments = comments.len(), questions = questions.len(), "Custom quiz generated");
    Ok(questions)
  }
}

/// A seed question not yet in `history`; when all have been asked, any seed.
pub fn fallback_question(difficulty: Difficulty, history: &QuestionHistory) -> Option<Question> {
  let seeds = seed_questions(difficulty);
  let fresh: Vec<&Question> = seeds.iter().filter(|q| !history.contains(&q.question)).collect();
  let pool: Vec<&Question> = if fresh.is_empty() { seeds.iter().collect() } else { fresh };
  pool.choose(&mut rand::thread_rng()).map(|q| (*q).clone())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;

  fn offline_state() -> AppState {
    AppState::with_parts(AppConfig::default(), None)
  }

  #[test]
  fn fallback_prefers_unseen_seeds() {
    let seeds = seed_questions(Difficulty::Medium);
    let mut history = QuestionHistory::new(10);
    history.push(seeds[0].question.clone());
    for _ in 0..10 {
      let q = fallback_question(Difficulty::Medium, &history).expect("seed");
      assert_ne!(q.question, seeds[0].question);
    }
  }

  #[test]
  fn fallback_recycles_when_everything_was_asked() {
    let mut history = QuestionHistory::new(10);
    for q in seed_questions(Difficulty::Hard) {
      history.push(q.question);
    }
    assert!(fallback_question(Difficulty::Hard, &history).is_some());
  }

  #[tokio::test]
  async fn offline_session_is_served_seed_questions() {
    let state = offline_state();
    let session = QuizSession::new(Difficulty::Easy, state.history_window());
    let (q, origin) = state.choose_question(&session).await.expect("seed question");
    assert_eq!(origin, "seed");
    assert_eq!(q.difficulty, "easy");
  }

  #[tokio::test]
  async fn offline_generation_reports_missing_generator() {
    let state = offline_state();
    let err = state
      .generate_question(Topic::Scope, Difficulty::Medium, &QuestionHistory::new(10))
      .await
      .expect_err("no generator");
    assert!(matches!(err, QuizError::GeneratorUnavailable));

    let err = state.custom_quiz("Comment: use const", Difficulty::Easy).await.expect_err("no generator");
    assert!(matches!(err, QuizError::GeneratorUnavailable));
  }

  /// Replays canned completions in order and counts the calls.
  struct Canned {
    replies: Mutex<VecDeque<std::result::Result<String, GeneratorError>>>,
    calls: AtomicUsize,
  }

  impl Canned {
    fn new(replies: Vec<std::result::Result<String, GeneratorError>>) -> Self {
      Self { replies: Mutex::new(replies.into()), calls: AtomicUsize::new(0) }
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl Completion for Canned {
    async fn complete(&self, _system: &str, _user: &str, _sampling: Sampling) -> std::result::Result<String, GeneratorError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.replies.lock().expect("replies lock").pop_front().unwrap_or(Err(GeneratorError::EmptyResponse))
    }
  }

  fn as_reply(q: &Question) -> std::result::Result<String, GeneratorError> {
    Ok(serde_json::to_string(q).expect("serialize"))
  }

  #[tokio::test]
  async fn duplicate_is_regenerated() {
    let state = offline_state();
    let seeds = seed_questions(Difficulty::Easy);
    let mut history = QuestionHistory::new(10);
    history.push(seeds[0].question.clone());

    let client = Canned::new(vec![as_reply(&seeds[0]), as_reply(&seeds[1])]);
    let q = state
      .generate_with(&client, Topic::Operators, Difficulty::Easy, &history)
      .await
      .expect("second attempt accepted");
    assert_eq!(q, seeds[1]);
    assert_eq!(client.calls(), 2);
  }

  #[tokio::test]
  async fn rate_limit_stops_after_first_attempt() {
    let state = offline_state();
    let seeds = seed_questions(Difficulty::Easy);
    let client = Canned::new(vec![
      Err(GeneratorError::RateLimited { retry_after: "7".into() }),
      as_reply(&seeds[0]),
    ]);
    let err = state
      .generate_with(&client, Topic::DataTypes, Difficulty::Easy, &QuestionHistory::new(10))
      .await
      .expect_err("rate limited");
    match err {
      QuizError::Generator(GeneratorError::RateLimited { retry_after }) => assert_eq!(retry_after, "7"),
      other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(client.calls(), 1);
  }

  #[tokio::test]
  async fn rejected_attempts_end_exhausted_with_last_error() {
    let state = offline_state();
    let seeds = seed_questions(Difficulty::Easy);
    let mut history = QuestionHistory::new(10);
    history.push(seeds[0].question.clone());

    let client = Canned::new(vec![
      Ok("Sure, here is a question!".into()),
      Err(GeneratorError::EmptyResponse),
      as_reply(&seeds[0]),
    ]);
    let err = state
      .generate_with(&client, Topic::DataTypes, Difficulty::Easy, &history)
      .await
      .expect_err("all rejected");
    match err {
      QuizError::Exhausted { attempts, last } => {
        assert_eq!(attempts, 3);
        assert!(last.is_duplicate());
      }
      other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(client.calls(), 3);
  }

  #[tokio::test]
  async fn custom_quiz_needs_review_comments() {
    let err = offline_state().custom_quiz("nothing useful here", Difficulty::Easy).await.expect_err("empty");
    assert!(matches!(err, QuizError::BadRequest(_)));
  }
}

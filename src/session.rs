//! In-memory quiz session: score, streaks, per-topic progress and the
//! question history used for novelty checks.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Difficulty, Question, Topic};
use crate::feedback::{answer_feedback, streak_feedback};
use crate::novelty::QuestionHistory;

pub const POINTS_PER_CORRECT: u32 = 100;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TopicProgress {
  pub total: u32,
  pub correct: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
  pub question: Question,
  pub user_answer: String,
  pub is_correct: bool,
}

/// End-of-session report.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary<'a> {
  pub session_id: &'a str,
  pub difficulty: Difficulty,
  pub score: u32,
  pub streak: u32,
  pub answered: usize,
  pub correct: usize,
  pub topic_progress: &'a BTreeMap<Topic, TopicProgress>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerOutcome {
  pub correct: bool,
  pub feedback: &'static str,
  pub streak_message: &'static str,
}

#[derive(Clone, Debug)]
pub struct QuizSession {
  pub id: String,
  pub difficulty: Difficulty,
  pub custom: bool,
  pub score: u32,
  pub streak: u32,
  pub correct_in_row: u32,
  pub topic_progress: BTreeMap<Topic, TopicProgress>,
  pub answered: Vec<AnsweredQuestion>,
  pub history: QuestionHistory,
}

impl QuizSession {
  pub fn new(difficulty: Difficulty, history_window: usize) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      difficulty,
      custom: false,
      score: 0,
      streak: 0,
      correct_in_row: 0,
      topic_progress: BTreeMap::new(),
      answered: Vec::new(),
      history: QuestionHistory::new(history_window),
    }
  }

  /// Remember a question that was shown so later ones can be checked against it.
  pub fn mark_asked(&mut self, question: &Question) {
    self.history.push(question.question.clone());
  }

  /// Record an answer. Correctness is exact string equality with the stored answer.
  #[instrument(level = "debug", skip(self, question, answer), fields(session = %self.id))]
  pub fn record_answer(&mut self, question: &Question, answer: &str) -> AnswerOutcome {
    let correct = answer == question.correct_answer;

    if correct {
      self.score += POINTS_PER_CORRECT;
      self.streak += 1;
      self.correct_in_row += 1;
    } else {
      self.streak = 0;
      self.correct_in_row = 0;
    }

    // Free-form topics from custom quizzes are not tracked.
    if !self.custom {
      if let Some(topic) = question.known_topic() {
        let progress = self.topic_progress.entry(topic).or_default();
        progress.total += 1;
        progress.correct += u32::from(correct);
      }
    }

    self.answered.push(AnsweredQuestion {
      question: question.clone(),
      user_answer: answer.to_string(),
      is_correct: correct,
    });

    info!(target: "jsquiz", session = %self.id, correct, score = self.score, streak = self.streak, "Answer recorded");

    AnswerOutcome {
      correct,
      feedback: answer_feedback(correct, &question.difficulty),
      streak_message: streak_feedback(self.correct_in_row),
    }
  }

  pub fn summary(&self) -> SessionSummary<'_> {
    SessionSummary {
      session_id: &self.id,
      difficulty: self.difficulty,
      score: self.score,
      streak: self.streak,
      answered: self.answered.len(),
      correct: self.answered.iter().filter(|a| a.is_correct).count(),
      topic_progress: &self.topic_progress,
    }
  }
}

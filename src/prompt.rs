//! Prompt construction for question generation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::Prompts;
use crate::domain::{Difficulty, Topic};
use crate::novelty::QuestionHistory;
use crate::review::{format_for_prompt, ReviewComment};
use crate::util::fill_template;

pub const QUESTION_STYLES: [&str; 10] = [
  "Explain what happens in this code",
  "Fix the bug in this code",
  "What is the output of this code",
  "Which best practice is demonstrated",
  "What would improve this code",
  "Identify the potential issue",
  "Complete the code to achieve",
  "Why does this code behave differently than",
  "How would you optimize this code",
  "What is the key concept illustrated by",
];

/// Pick the topic for the next question at `difficulty`.
pub fn next_topic<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Topic {
  difficulty.topics().choose(rng).copied().unwrap_or(Topic::Variables)
}

pub fn question_prompt<R: Rng + ?Sized>(
  prompts: &Prompts,
  topic: Topic,
  difficulty: Difficulty,
  history: &QuestionHistory,
  rng: &mut R,
) -> String {
  let style = QUESTION_STYLES.choose(rng).copied().unwrap_or(QUESTION_STYLES[0]);
  let avoid = if history.is_empty() {
    String::new()
  } else {
    fill_template(&prompts.avoid_template, &[("previous", &history.to_blob())])
  };
  fill_template(
    &prompts.question_user_template,
    &[
      ("style", style),
      ("topic", topic.as_str()),
      ("difficulty", difficulty.as_str()),
      ("avoid", &avoid),
    ],
  )
}

pub fn custom_prompt(prompts: &Prompts, comments: &[ReviewComment], difficulty: Difficulty) -> String {
  let upper = difficulty.as_str().to_uppercase();
  fill_template(
    &prompts.custom_user_template,
    &[
      ("comments", &format_for_prompt(comments)),
      ("difficulty_upper", &upper),
      ("difficulty", difficulty.as_str()),
    ],
  )
}

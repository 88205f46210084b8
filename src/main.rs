//! jsquiz · JavaScript quiz generator and validator
//!
//! - Generates quiz questions through an OpenAI-compatible chat API (Mistral by default)
//! - Repairs and validates model output into canonical questions, rejecting repeats
//! - Interactive terminal quiz with score/streak tracking and seed fallback
//!
//! Important env variables:
//!   MISTRAL_API_KEY   : enables generation if present
//!   MISTRAL_API_URL   : default "https://api.mistral.ai/v1"
//!   QUIZ_MODEL        : overrides the configured model
//!   QUIZ_CONFIG_PATH  : path to TOML config (prompts, generation, novelty)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod concepts;
mod config;
mod domain;
mod error;
mod feedback;
mod generator;
mod novelty;
mod pipeline;
mod prompt;
mod repair;
mod review;
mod seeds;
mod session;
mod state;
mod telemetry;
mod util;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{info, instrument};

use crate::domain::{Difficulty, Question, Topic};
use crate::error::QuizError;
use crate::novelty::QuestionHistory;
use crate::pipeline::{custom_quiz_from_response, question_from_response};
use crate::session::QuizSession;
use crate::state::AppState;
use crate::validate::QuizMode;

#[derive(Parser)]
#[command(name = "jsquiz", version, about = "JavaScript quiz questions, generated and validated")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Generate one validated question and print it as JSON.
  Generate {
    #[arg(short, long, value_enum, default_value_t = Difficulty::Easy)]
    difficulty: Difficulty,
    /// Topic to ask about; random for the difficulty when omitted.
    #[arg(short, long, value_parser = parse_topic)]
    topic: Option<Topic>,
    /// Previous questions to avoid, comma or newline separated.
    #[arg(short, long)]
    exclude: Option<String>,
  },
  /// Generate a custom quiz from a code-review export and print it as JSON.
  Custom {
    /// File with the review export.
    reviews: PathBuf,
    #[arg(short, long, value_enum, default_value_t = Difficulty::Easy)]
    difficulty: Difficulty,
  },
  /// Repair and validate raw model output (file or stdin) without calling the generator.
  Check {
    file: Option<PathBuf>,
    /// Validate as a custom quiz batch (`{"questions": [...]}`).
    #[arg(long)]
    custom: bool,
    /// Previous questions to check for repeats, comma or newline separated.
    #[arg(short, long)]
    exclude: Option<String>,
  },
  /// Play an interactive quiz in the terminal.
  Play {
    #[arg(short, long, value_enum, default_value_t = Difficulty::Easy)]
    difficulty: Difficulty,
    #[arg(short, long, default_value_t = 10)]
    rounds: usize,
    /// Play a custom quiz built from this review export instead.
    #[arg(long)]
    reviews: Option<PathBuf>,
  },
}

fn parse_topic(s: &str) -> Result<Topic, String> {
  s.parse()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();
  let cli = Cli::parse();
  let state = AppState::new();

  match cli.command {
    Command::Generate { difficulty, topic, exclude } => {
      let history = QuestionHistory::from_blob(exclude.as_deref().unwrap_or_default(), state.history_window());
      let topic = topic.unwrap_or_else(|| prompt::next_topic(difficulty, &mut rand::thread_rng()));
      let question = state.generate_question(topic, difficulty, &history).await?;
      print_json(&question)?;
    }
    Command::Custom { reviews, difficulty } => {
      let text = tokio::fs::read_to_string(&reviews).await?;
      let questions = state.custom_quiz(&text, difficulty).await?;
      print_json(&questions)?;
    }
    Command::Check { file, custom, exclude } => {
      let raw = match file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
          let mut buf = String::new();
          tokio::io::stdin().read_to_string(&mut buf).await?;
          buf
        }
      };
      if custom {
        print_json(&custom_quiz_from_response(&state.validator, &raw)?)?;
      } else {
        let history = exclude.map(|blob| QuestionHistory::from_blob(&blob, state.history_window()));
        print_json(&question_from_response(&state.validator, &raw, history.as_ref(), QuizMode::Standard)?)?;
      }
    }
    Command::Play { difficulty, rounds, reviews } => {
      let custom = match reviews {
        Some(path) => {
          let text = tokio::fs::read_to_string(path).await?;
          Some(state.custom_quiz(&text, difficulty).await?)
        }
        None => None,
      };
      play(&state, difficulty, rounds, custom).await?;
    }
  }
  Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[instrument(level = "info", skip(state, custom), fields(%difficulty, custom = custom.is_some()))]
async fn play(
  state: &AppState,
  difficulty: Difficulty,
  rounds: usize,
  custom: Option<Vec<Question>>,
) -> Result<(), QuizError> {
  let mut session = QuizSession::new(difficulty, state.history_window());
  session.custom = custom.is_some();
  let mut custom_queue = custom.unwrap_or_default().into_iter();
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  info!(target: "jsquiz", session = %session.id, "Quiz started");

  for round in 1..=rounds {
    let question = if session.custom {
      match custom_queue.next() {
        Some(q) => q,
        None => break,
      }
    } else {
      state.choose_question(&session).await?.0
    };
    session.mark_asked(&question);

    println!("\nQuestion {round} [{}] {}", question.topic, question.question);
    if let Some(code) = &question.code {
      println!("\n{code}\n");
    }
    for (i, opt) in question.options.iter().enumerate() {
      println!("  {}. {opt}", i + 1);
    }
    println!("Your answer (number or text, empty to stop):");

    let Some(line) = lines.next_line().await? else { break };
    let line = line.trim();
    if line.is_empty() {
      break;
    }
    let answer = line
      .parse::<usize>()
      .ok()
      .and_then(|n| n.checked_sub(1))
      .and_then(|i| question.options.get(i))
      .map(String::as_str)
      .unwrap_or(line);

    let outcome = session.record_answer(&question, answer);
    println!("{}", outcome.feedback);
    if !outcome.correct {
      println!("Correct answer: {}", question.correct_answer);
    }
    if !question.explanation.is_empty() {
      println!("{}", question.explanation);
    }
    if !outcome.streak_message.is_empty() {
      println!("{}", outcome.streak_message);
    }
    println!("Score: {}  Streak: {}", session.score, session.streak);
  }

  print_json(&session.summary()).map_err(|e| QuizError::Io(e.into()))?;
  Ok(())
}

//! Loading application configuration (prompts, generation knobs, novelty) from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.

use serde::Deserialize;
use tracing::{error, info};

use crate::novelty::NoveltyConfig;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub novelty: NoveltyConfig,
}

/// Sampling parameters for the chat-completions calls.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  pub custom_temperature: f32,
  pub custom_max_tokens: u32,
  pub custom_top_p: f32,
  /// How many times a single question is requested before giving up
  /// (duplicates and malformed answers both count).
  pub max_attempts: usize,
  pub timeout_secs: u64,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      model: "mistral-tiny".into(),
      temperature: 0.7,
      max_tokens: 1000,
      custom_temperature: 0.5,
      custom_max_tokens: 2000,
      custom_top_p: 0.9,
      max_attempts: 3,
      timeout_secs: 30,
    }
  }
}

/// Prompt templates. Placeholders are filled with `util::fill_template`.
///
/// Question template: `{style}`, `{topic}`, `{difficulty}`, `{avoid}`.
/// Custom template: `{comments}`, `{difficulty}`, `{difficulty_upper}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub avoid_template: String,
  pub custom_system: String,
  pub custom_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are an expert JavaScript educator writing quiz questions about modern JavaScript. Every question must be new and must follow the requested JSON format exactly.".into(),
      question_user_template: concat!(
        "Write one JavaScript quiz question in the style \"{style}\".\n",
        "Topic: {topic}\nDifficulty: {difficulty}\n{avoid}\n",
        "Reply with JSON only, shaped as:\n",
        "{\"question\": string, \"code\": string or null, \"options\": [4 strings], ",
        "\"correctAnswer\": string, \"explanation\": string, \"topic\": \"{topic}\", \"difficulty\": \"{difficulty}\"}\n",
        "Rules: exactly 4 distinct options; correctAnswer is a verbatim copy of one option; ",
        "no letter prefixes such as \"A)\" on options; never merge two options into one answer."
      ).into(),
      avoid_template: "Do not repeat any of these earlier questions:\n{previous}".into(),
      custom_system: "You write short programming quiz questions from code review feedback. Keep them concise and focused.".into(),
      custom_user_template: concat!(
        "These code review comments describe a developer's habits:\n\n{comments}\n\n",
        "Write 5 to 10 quiz questions at {difficulty_upper} difficulty that target the weak spots they reveal.\n",
        "Reply with JSON only: {\"questions\": [{\"question\": string, \"code\": string or null, ",
        "\"options\": [3 or 4 short strings], \"correctAnswer\": string, \"explanation\": string, ",
        "\"topic\": string, \"difficulty\": \"{difficulty}\", \"sourceComments\": [comment indices]}]}\n",
        "Rules: correctAnswer is a verbatim copy of one option; keep code and answers short."
      ).into(),
    }
  }
}

/// Attempt to load `AppConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "jsquiz", %path, "Loaded config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "jsquiz", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "jsquiz", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

//! Minimal chat-completions client used to generate questions.
//!
//! Works against any OpenAI-compatible endpoint; Mistral is the default.
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::GenerationSettings;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_RETRY_AFTER: &str = "5";

#[derive(Debug, Error)]
pub enum GeneratorError {
  #[error("Rate limit exceeded. Please try again in {retry_after} seconds.")]
  RateLimited { retry_after: String },

  #[error("API responded with status {status}: {message}")]
  Status { status: StatusCode, message: String },

  #[error("Invalid API response format")]
  EmptyResponse,

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),
}

/// Sampling knobs for one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampling {
  pub temperature: f32,
  pub max_tokens: u32,
  pub top_p: Option<f32>,
}

impl Sampling {
  pub fn question(settings: &GenerationSettings) -> Self {
    Self { temperature: settings.temperature, max_tokens: settings.max_tokens, top_p: None }
  }

  pub fn custom(settings: &GenerationSettings) -> Self {
    Self {
      temperature: settings.custom_temperature,
      max_tokens: settings.custom_max_tokens,
      top_p: Some(settings.custom_top_p),
    }
  }
}

/// One chat completion: system and user message in, first choice text out.
pub trait Completion {
  async fn complete(&self, system: &str, user: &str, sampling: Sampling) -> Result<String, GeneratorError>;
}

#[derive(Clone)]
pub struct ChatClient {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl ChatClient {
  /// Construct the client if we find MISTRAL_API_KEY; otherwise return None.
  /// MISTRAL_API_URL overrides the base URL and QUIZ_MODEL the configured model.
  pub fn from_env(settings: &GenerationSettings) -> Option<Self> {
    let api_key = std::env::var("MISTRAL_API_KEY").ok().filter(|k| !k.is_empty())?;
    let base_url = std::env::var("MISTRAL_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("QUIZ_MODEL").unwrap_or_else(|_| settings.model.clone());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(settings.timeout_secs))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
  }
}

impl Completion for ChatClient {
  /// Plain-text chat completion; returns the first choice's content.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn complete(&self, system: &str, user: &str, sampling: Sampling) -> Result<String, GeneratorError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature: sampling.temperature,
      max_tokens: sampling.max_tokens,
      top_p: sampling.top_p,
    };

    let start = Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "jsquiz/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await?;

    let status = res.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      let retry_after = res
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
        .to_string();
      error!(%retry_after, "Generator rate limited");
      return Err(GeneratorError::RateLimited { retry_after });
    }
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      error!(%status, "Generator call failed");
      return Err(GeneratorError::Status { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Generator usage");
    }
    let text = first_content(body).ok_or(GeneratorError::EmptyResponse)?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Generator response received");
    Ok(text)
  }
}

fn first_content(body: ChatCompletionResponse) -> Option<String> {
  body
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .filter(|t| !t.trim().is_empty())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  max_tokens: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  top_p: Option<f32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  #[derive(Deserialize)]
  struct Flat { message: String }
  serde_json::from_str::<EWrap>(body)
    .map(|w| w.error.message)
    .or_else(|_| serde_json::from_str::<Flat>(body).map(|f| f.message))
    .ok()
}

//! Cleanup of raw model output before JSON parsing.
//!
//! Models wrap JSON in Markdown fences, leave trailing commas and sometimes
//! emit several objects back to back. Parsing is attempted on a light cleanup
//! first and, if that fails, once more on a full repair.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::trunc_for_log;

static CODE_FENCE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"```(?:json)?[ \t]*\r?\n?").expect("code fence pattern"));

static TRAILING_COMMA: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r",(\s*[\]}])").expect("trailing comma pattern"));

static ADJACENT_OBJECTS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\}\s*\{").expect("adjacent objects pattern"));

static ADJACENT_ARRAYS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\]\s*\[").expect("adjacent arrays pattern"));

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to parse JSON: {first}")]
pub struct RepairError {
  /// Parser message for the lightly cleaned text.
  pub first: String,
  /// Parser message after the full repair.
  pub retry: String,
}

fn strip_fences(raw: &str) -> String {
  CODE_FENCE.replace_all(raw, "").trim().to_string()
}

fn drop_trailing_commas(text: &str) -> String {
  TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

fn join_adjacent_literals(text: &str) -> String {
  let objects = ADJACENT_OBJECTS.replace_all(text, "},{");
  ADJACENT_ARRAYS.replace_all(&objects, "],[").into_owned()
}

/// Fences and trailing commas only.
pub fn light_repair(raw: &str) -> String {
  drop_trailing_commas(&strip_fences(raw))
}

/// Every repair: fences, trailing commas and missing commas between adjacent
/// object/array literals. Never fails; text that cannot be helped is returned
/// as cleaned as possible.
pub fn repair(raw: &str) -> String {
  drop_trailing_commas(&join_adjacent_literals(&light_repair(raw)))
}

/// Parse model output. Well-formed JSON inside optional fences is taken as is;
/// otherwise the light cleanup is tried, then the full repair.
pub fn parse_model_json(raw: &str) -> Result<Value, RepairError> {
  // Comma rewrites are not string-aware and would alter code snippets in valid JSON.
  if let Ok(v) = serde_json::from_str::<Value>(&strip_fences(raw)) {
    return Ok(v);
  }

  let light = light_repair(raw);
  let first = match serde_json::from_str::<Value>(&light) {
    Ok(v) => return Ok(v),
    Err(e) => e,
  };

  let full = repair(raw);
  warn!(target: "question", error = %first, "First JSON parse failed; retrying on repaired text");
  debug!(target: "question", repaired = %trunc_for_log(&full, 400), "Repaired model output");

  serde_json::from_str::<Value>(&full).map_err(|retry| RepairError {
    first: first.to_string(),
    retry: retry.to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn fenced_json_with_trailing_comma_parses() {
    let raw = "```json\n{\n  \"question\": \"q\",\n  \"options\": [\"a\", \"b\",],\n}\n```";
    let v = parse_model_json(raw).expect("repairable");
    assert_eq!(v, json!({ "question": "q", "options": ["a", "b"] }));
  }

  #[test]
  fn bare_fences_are_removed() {
    assert_eq!(light_repair("```\n[1, 2]\n```"), "[1, 2]");
  }

  #[test]
  fn adjacent_objects_get_a_separating_comma() {
    assert_eq!(repair("[{\"a\":1} {\"b\":2}]"), "[{\"a\":1},{\"b\":2}]");
    assert_eq!(repair("[[1]\n[2]]"), "[[1],[2]]");
  }

  #[test]
  fn second_pass_recovers_concatenated_objects() {
    let raw = "{\"questions\": [{\"question\": \"one\"}\n{\"question\": \"two\"},]}";
    let v = parse_model_json(raw).expect("second pass");
    assert_eq!(v["questions"].as_array().map(Vec::len), Some(2));
  }

  #[test]
  fn hopeless_input_reports_the_first_parser_message() {
    let err = parse_model_json("this is not json").expect_err("unparseable");
    assert!(err.to_string().starts_with("Failed to parse JSON: "));
    assert!(err.to_string().contains(&err.first));
    assert!(!err.retry.is_empty());
  }

  #[test]
  fn valid_json_is_left_alone() {
    let raw = r#"{"code": "if (a) { b(); }", "n": [1, 2]}"#;
    assert_eq!(repair(raw), raw);
  }

  #[test]
  fn valid_json_keeps_trailing_commas_inside_strings() {
    let raw = r#"```json
{"code": "const a = [1,,];\nconst o = { a: 1, };", "options": ["2", "1", "{ a: 1, }", "[1,]"]}
```"#;
    let v = parse_model_json(raw).expect("valid json");
    assert_eq!(v["code"], "const a = [1,,];\nconst o = { a: 1, };");
    assert_eq!(v["options"], json!(["2", "1", "{ a: 1, }", "[1,]"]));
  }
}

//! Domain models: topics, difficulties and the canonical question.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// JavaScript topics a standard question may belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
  Variables,
  Operators,
  DataTypes,
  Conditionals,
  Arrays,
  Objects,
  Functions,
  Loops,
  Scope,
  Closures,
  Promises,
  AsyncAwait,
  Prototypes,
  ThisKeyword,
}

impl Topic {
  pub const ALL: [Topic; 14] = [
    Topic::Variables,
    Topic::Operators,
    Topic::DataTypes,
    Topic::Conditionals,
    Topic::Arrays,
    Topic::Objects,
    Topic::Functions,
    Topic::Loops,
    Topic::Scope,
    Topic::Closures,
    Topic::Promises,
    Topic::AsyncAwait,
    Topic::Prototypes,
    Topic::ThisKeyword,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Topic::Variables => "variables",
      Topic::Operators => "operators",
      Topic::DataTypes => "data-types",
      Topic::Conditionals => "conditionals",
      Topic::Arrays => "arrays",
      Topic::Objects => "objects",
      Topic::Functions => "functions",
      Topic::Loops => "loops",
      Topic::Scope => "scope",
      Topic::Closures => "closures",
      Topic::Promises => "promises",
      Topic::AsyncAwait => "async-await",
      Topic::Prototypes => "prototypes",
      Topic::ThisKeyword => "this-keyword",
    }
  }

  /// Comma-separated whitelist, used in validation error messages.
  pub fn whitelist() -> String {
    Topic::ALL.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
  }
}

impl fmt::Display for Topic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Topic {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Topic::ALL
      .iter()
      .copied()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| format!("unknown topic '{s}'"))
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  #[default]
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }

  /// Topics drawn from when generating a question at this level.
  pub fn topics(self) -> &'static [Topic] {
    match self {
      Difficulty::Easy => &[Topic::Variables, Topic::Operators, Topic::DataTypes, Topic::Conditionals],
      Difficulty::Medium => &[Topic::Arrays, Topic::Objects, Topic::Functions, Topic::Loops, Topic::Scope],
      Difficulty::Hard => &[
        Topic::Closures,
        Topic::Promises,
        Topic::AsyncAwait,
        Topic::Prototypes,
        Topic::ThisKeyword,
      ],
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(format!("unknown difficulty '{other}'")),
    }
  }
}

/// Canonical, validated quiz question. Built once by the validator and never mutated.
///
/// `topic` is a string because custom quizzes carry free-form topics; standard
/// questions always hold one of [`Topic::ALL`]. `difficulty` and `explanation`
/// are whatever the generator sent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub question: String,
  pub code: Option<String>,
  pub options: Vec<String>,
  pub correct_answer: String,
  pub explanation: String,
  pub topic: String,
  pub difficulty: String,
}

impl Question {
  /// Whitelisted topic, if this question has one.
  pub fn known_topic(&self) -> Option<Topic> {
    self.topic.parse().ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn topic_names_round_trip_through_from_str() {
    for t in Topic::ALL {
      assert_eq!(t.as_str().parse::<Topic>(), Ok(t));
    }
    assert!("Closures".parse::<Topic>().is_err());
    assert!("hoisting".parse::<Topic>().is_err());
  }

  #[test]
  fn difficulty_topic_tables_cover_every_topic_once() {
    let mut all: Vec<Topic> = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
      .iter()
      .flat_map(|d| d.topics().iter().copied())
      .collect();
    all.sort();
    let mut expected = Topic::ALL.to_vec();
    expected.sort();
    assert_eq!(all, expected);
  }

  #[test]
  fn question_serializes_with_camel_case_answer() {
    let q = Question {
      question: "q".into(),
      code: None,
      options: vec!["a".into(), "b".into(), "c".into()],
      correct_answer: "a".into(),
      explanation: String::new(),
      topic: "scope".into(),
      difficulty: "easy".into(),
    };
    let v = serde_json::to_value(&q).expect("serialize");
    assert_eq!(v["correctAnswer"], "a");
    assert!(v["code"].is_null());
    assert_eq!(q.known_topic(), Some(Topic::Scope));
  }
}

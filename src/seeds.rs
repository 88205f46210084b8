//! Built-in questions that keep the quiz usable without a generator.

use crate::domain::{Difficulty, Question, Topic};

fn seed(
  difficulty: Difficulty,
  topic: Topic,
  question: &str,
  code: Option<&str>,
  options: [&str; 4],
  correct: usize,
  explanation: &str,
) -> Question {
  Question {
    question: question.into(),
    code: code.map(Into::into),
    options: options.iter().map(|o| o.to_string()).collect(),
    correct_answer: options[correct].into(),
    explanation: explanation.into(),
    topic: topic.as_str().into(),
    difficulty: difficulty.as_str().into(),
  }
}

/// Seed questions for one difficulty level.
pub fn seed_questions(difficulty: Difficulty) -> Vec<Question> {
  use Difficulty::*;
  match difficulty {
    Easy => vec![
      seed(
        Easy,
        Topic::DataTypes,
        "What does typeof null evaluate to?",
        Some("console.log(typeof null);"),
        ["\"object\"", "\"null\"", "\"undefined\"", "\"number\""],
        0,
        "typeof null returns \"object\", a long-standing quirk kept for compatibility.",
      ),
      seed(
        Easy,
        Topic::Operators,
        "Which comparison is true without any type coercion?",
        None,
        ["1 === 1", "1 == \"1\"", "0 == false", "null == undefined"],
        0,
        "Strict equality compares value and type; the other three rely on coercion.",
      ),
      seed(
        Easy,
        Topic::Variables,
        "Why does reassigning a const binding fail?",
        Some("const limit = 3;\nlimit = 4;"),
        [
          "The binding cannot be reassigned",
          "Numbers are immutable",
          "const values are frozen deeply",
          "limit is a reserved word",
        ],
        0,
        "const prevents reassignment of the binding, not mutation of the value it holds.",
      ),
    ],
    Medium => vec![
      seed(
        Medium,
        Topic::Arrays,
        "What is logged after mapping with parseInt?",
        Some("console.log([\"1\", \"2\", \"3\"].map(parseInt));"),
        ["[1, NaN, NaN]", "[1, 2, 3]", "[\"1\", \"2\", \"3\"]", "[NaN, NaN, NaN]"],
        0,
        "map passes the index as parseInt's radix, so radix 1 and 2 give NaN.",
      ),
      seed(
        Medium,
        Topic::Scope,
        "Which value does the inner console.log print?",
        Some("let x = 1;\n{\n  let x = 2;\n  console.log(x);\n}"),
        ["2", "1", "undefined", "ReferenceError"],
        0,
        "let is block scoped, so the inner declaration shadows the outer one.",
      ),
    ],
    Hard => vec![
      seed(
        Hard,
        Topic::Closures,
        "What do the scheduled callbacks print when the loop uses var?",
        Some("for (var i = 0; i < 3; i++) {\n  setTimeout(() => console.log(i));\n}"),
        ["3 3 3", "0 1 2", "0 0 0", "undefined three times"],
        0,
        "All callbacks close over one function-scoped i, which is 3 when they run.",
      ),
      seed(
        Hard,
        Topic::Promises,
        "In which order are the messages logged?",
        Some("setTimeout(() => console.log(\"timeout\"));\nPromise.resolve().then(() => console.log(\"micro\"));\nconsole.log(\"sync\");"),
        ["sync, micro, timeout", "sync, timeout, micro", "micro, sync, timeout", "timeout, micro, sync"],
        0,
        "Synchronous code runs first, then microtasks, then macrotasks such as timers.",
      ),
    ],
  }
}

//! Parsing of pasted code-review exports used to seed custom quizzes.
//!
//! The export is a sequence of blocks separated by a line of 30 dashes. A block
//! counts only if it has a `Comment:` line; a `File:` line is optional.

const BLOCK_SEPARATOR: &str = "------------------------------";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewComment {
  /// Position of the block in the export, counting skipped blocks too.
  pub index: usize,
  pub comment: String,
  pub file: Option<String>,
  /// The whole block, trimmed.
  pub context: String,
}

pub fn parse_review_comments(text: &str) -> Vec<ReviewComment> {
  text
    .split(BLOCK_SEPARATOR)
    .enumerate()
    .filter_map(|(index, block)| {
      let line_after = |label: &str| {
        block
          .lines()
          .map(str::trim)
          .find_map(|l| l.strip_prefix(label))
          .map(|rest| rest.trim().to_string())
      };
      let comment = line_after("Comment:")?;
      Some(ReviewComment {
        index,
        comment,
        file: line_after("File:"),
        context: block.trim().to_string(),
      })
    })
    .collect()
}

/// Render comments for the custom quiz prompt.
pub fn format_for_prompt(comments: &[ReviewComment]) -> String {
  comments
    .iter()
    .map(|c| {
      let file = c.file.as_deref().map(|f| format!("File: {f}\n")).unwrap_or_default();
      format!("Comment {}: {}\nContext: {}{}", c.index, c.comment, file, c.context)
    })
    .collect::<Vec<_>>()
    .join("\n\n")
}

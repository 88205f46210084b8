//! Learner-facing feedback lines shown after an answer.

pub fn answer_feedback(correct: bool, difficulty: &str) -> &'static str {
  if !correct {
    return "Don't worry! JavaScript concepts take time to master. Let's understand why:";
  }
  match difficulty {
    "easy" => "Good job! You're getting the basics down. Keep going!",
    "medium" => "Excellent work! You're mastering intermediate concepts!",
    "hard" => "Outstanding! You're handling advanced JavaScript like a pro!",
    _ => "Well done! Keep up the great work!",
  }
}

/// Encouragement for a run of correct answers; empty when there is no run.
pub fn streak_feedback(correct_in_row: u32) -> &'static str {
  match correct_in_row {
    0 => "",
    1 => "Great start! Keep the momentum going!",
    2 => "You're on a roll! Ready for some harder questions?",
    3 => "Impressive streak! You're almost at advanced level!",
    _ => "Amazing! You're mastering these concepts!",
  }
}

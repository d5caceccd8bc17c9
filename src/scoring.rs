use serde::{Deserialize, Serialize};

use crate::quiz_session::QuizSession;

/// Derived metrics of a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub wrong_count: usize,
    pub unanswered_count: usize,
    pub success_rate_percent: u32,
    /// Quarter-penalty net: `max(0, correct - wrong / 4)`, two decimals.
    /// Deliberately fractional; never clamp this to an integer.
    pub net: f64,
    pub elapsed_seconds: u64,
    pub timed_out: bool,
}

/// Derive the score of a session. A question counts as correct iff its stored
/// answer is non-null and equals the cached resolved index, so questions
/// whose answer never resolved can only score as wrong or unanswered.
pub fn score(session: &QuizSession) -> ScoreResult {
    let total = session.questions().len();
    let mut correct_count = 0;
    let mut wrong_count = 0;
    for (question, answer) in session.questions().iter().zip(session.answers()) {
        match answer {
            Some(choice) if question.correct_choice_index == Some(*choice) => correct_count += 1,
            Some(_) => wrong_count += 1,
            None => {}
        }
    }
    let unanswered_count = total - correct_count - wrong_count;
    let success_rate_percent = if total == 0 {
        0
    } else {
        (100.0 * correct_count as f64 / total as f64).round() as u32
    };
    let net = (correct_count as f64 - wrong_count as f64 / 4.0).max(0.0);
    ScoreResult {
        correct_count,
        wrong_count,
        unanswered_count,
        success_rate_percent,
        net: (net * 100.0).round() / 100.0,
        elapsed_seconds: session.elapsed_seconds(),
        timed_out: session.timed_out(),
    }
}

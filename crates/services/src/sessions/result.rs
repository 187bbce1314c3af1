use chrono::{DateTime, Utc};

use study_core::model::{Learner, Question, TestSummary, TestSummaryError};

/// A question the learner got wrong, in the order it was asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncorrectAnswer {
    /// Position of the question within the session.
    pub index: usize,
    pub question: Question,
    pub chosen: String,
}

/// Final scored outcome of a test session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub learner: Option<Learner>,
    pub total: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub score_percentage: u8,
    pub passed: bool,
    pub timed_out: bool,
    /// Index of an incorrect answer whose explanation was still on screen at timeout.
    pub unacknowledged: Option<usize>,
    pub incorrect_answers: Vec<IncorrectAnswer>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl TestResult {
    #[must_use]
    pub fn has_review(&self) -> bool {
        !self.incorrect_answers.is_empty()
    }

    /// History row for this result.
    ///
    /// # Errors
    ///
    /// Returns `TestSummaryError` if the counts or timestamps are inconsistent.
    pub fn to_summary(&self, learner: &Learner) -> Result<TestSummary, TestSummaryError> {
        TestSummary::from_persisted(
            learner.roll_no(),
            learner.name(),
            self.started_at,
            self.completed_at,
            self.total,
            self.correct,
            self.incorrect,
            self.score_percentage,
            self.passed,
            self.timed_out,
        )
    }
}

/// `correct / total * 100`, rounded half up.
#[must_use]
pub fn score_percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_up() {
        assert_eq!(score_percentage(4, 5), 80);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 8), 13);
        assert_eq!(score_percentage(0, 5), 0);
        assert_eq!(score_percentage(5, 5), 100);
    }

    #[test]
    fn empty_total_scores_zero() {
        assert_eq!(score_percentage(0, 0), 0);
    }
}

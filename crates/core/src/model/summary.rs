use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("answered questions ({answered}) exceed total ({total})")]
    CountMismatch { total: u32, answered: u32 },

    #[error("score {0} is outside 0..=100")]
    InvalidScore(u8),
}

/// Scored outcome of one finished test, without the question bodies.
///
/// This is the shape kept in result history; the full per-question result
/// lives with the session that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    roll_no: String,
    name: String,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total: u32,
    correct: u32,
    incorrect: u32,
    score_percentage: u8,
    passed: bool,
    timed_out: bool,
}

impl TestSummary {
    /// Rehydrate or build a summary.
    ///
    /// # Errors
    ///
    /// Returns `TestSummaryError` if the timestamps are reversed, the answer
    /// counts exceed the total, or the score is above 100.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn from_persisted(
        roll_no: impl Into<String>,
        name: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total: u32,
        correct: u32,
        incorrect: u32,
        score_percentage: u8,
        passed: bool,
        timed_out: bool,
    ) -> Result<Self, TestSummaryError> {
        if completed_at < started_at {
            return Err(TestSummaryError::InvalidTimeRange);
        }
        let answered = correct.saturating_add(incorrect);
        if answered > total {
            return Err(TestSummaryError::CountMismatch { total, answered });
        }
        if score_percentage > 100 {
            return Err(TestSummaryError::InvalidScore(score_percentage));
        }

        Ok(Self {
            roll_no: roll_no.into(),
            name: name.into(),
            started_at,
            completed_at,
            total,
            correct,
            incorrect,
            score_percentage,
            passed,
            timed_out,
        })
    }

    #[must_use]
    pub fn roll_no(&self) -> &str {
        &self.roll_no
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.total - self.correct - self.incorrect
    }

    #[must_use]
    pub fn score_percentage(&self) -> u8 {
        self.score_percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_more_answers_than_questions() {
        let now = fixed_now();
        let err =
            TestSummary::from_persisted("1", "A", now, now, 3, 2, 2, 67, false, false).unwrap_err();
        assert_eq!(
            err,
            TestSummaryError::CountMismatch {
                total: 3,
                answered: 4
            }
        );
    }

    #[test]
    fn counts_unanswered() {
        let now = fixed_now();
        let summary =
            TestSummary::from_persisted("1", "A", now, now, 5, 2, 1, 40, false, true).unwrap();
        assert_eq!(summary.unanswered(), 2);
    }
}

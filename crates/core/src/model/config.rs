use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("timer must be > 0 seconds")]
    InvalidTimer,

    #[error("question limit must be > 0")]
    InvalidQuestionLimit,

    #[error("passing percentage must be between 1 and 100, got {0}")]
    InvalidPassingPercentage(u8),

    #[error("review duration must be > 0 seconds")]
    InvalidReviewDuration,

    #[error("per-question review time must be > 0 seconds")]
    InvalidReviewQuestionTime,
}

//
// ─── SESSION CONFIG ────────────────────────────────────────────────────────────
//

/// Settings for one timed test attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    timer_secs: u32,
    question_limit: u32,
    passing_percentage: u8,
}

impl SessionConfig {
    /// Creates a validated session config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the timer or limit is zero, or the passing
    /// percentage is outside `1..=100`.
    pub fn new(
        timer_secs: u32,
        question_limit: u32,
        passing_percentage: u8,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            timer_secs,
            question_limit,
            passing_percentage,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants again; used for configs that came through serde.
    ///
    /// # Errors
    ///
    /// See [`SessionConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timer_secs == 0 {
            return Err(ConfigError::InvalidTimer);
        }
        if self.question_limit == 0 {
            return Err(ConfigError::InvalidQuestionLimit);
        }
        if !(1..=100).contains(&self.passing_percentage) {
            return Err(ConfigError::InvalidPassingPercentage(
                self.passing_percentage,
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timer_secs(&self) -> u32 {
        self.timer_secs
    }

    #[must_use]
    pub fn question_limit(&self) -> u32 {
        self.question_limit
    }

    #[must_use]
    pub fn passing_percentage(&self) -> u8 {
        self.passing_percentage
    }

    /// Number of questions a session will actually use.
    #[must_use]
    pub fn effective_question_count(&self, available: usize) -> usize {
        let limit = usize::try_from(self.question_limit).unwrap_or(usize::MAX);
        limit.min(available)
    }
}

impl Default for SessionConfig {
    /// Ten minutes, ten questions, 70% to pass.
    fn default() -> Self {
        Self {
            timer_secs: 600,
            question_limit: 10,
            passing_percentage: 70,
        }
    }
}

//
// ─── REVIEW SETTINGS ───────────────────────────────────────────────────────────
//

/// Default overall review budget (30 minutes).
pub const DEFAULT_REVIEW_SECS: u32 = 30 * 60;

/// Default time each missed question stays on screen during review.
pub const DEFAULT_REVIEW_QUESTION_SECS: u32 = 15;

/// Timing for the review-of-incorrect-answers loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSettings {
    overall_secs: u32,
    per_question_secs: u32,
}

impl ReviewSettings {
    /// # Errors
    ///
    /// Returns `ConfigError` if either duration is zero.
    pub fn new(overall_secs: u32, per_question_secs: u32) -> Result<Self, ConfigError> {
        if overall_secs == 0 {
            return Err(ConfigError::InvalidReviewDuration);
        }
        if per_question_secs == 0 {
            return Err(ConfigError::InvalidReviewQuestionTime);
        }
        Ok(Self {
            overall_secs,
            per_question_secs,
        })
    }

    #[must_use]
    pub fn overall_secs(&self) -> u32 {
        self.overall_secs
    }

    #[must_use]
    pub fn per_question_secs(&self) -> u32 {
        self.per_question_secs
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            overall_secs: DEFAULT_REVIEW_SECS,
            per_question_secs: DEFAULT_REVIEW_QUESTION_SECS,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

use log::debug;

use study_core::model::ReviewSettings;

use super::result::IncorrectAnswer;
use crate::error::ReviewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase {
    Idle,
    Reviewing,
    Complete,
}

/// Timed loop over the questions a learner got wrong.
///
/// Each question stays up for the per-question budget, then the next one is
/// shown, wrapping around to the first. Only the overall budget or an explicit
/// `end_early` stops the loop.
#[derive(Debug, Clone)]
pub struct ReviewSession {
    items: Vec<IncorrectAnswer>,
    settings: ReviewSettings,
    index: usize,
    remaining_overall_secs: u32,
    remaining_question_secs: u32,
    phase: ReviewPhase,
}

impl ReviewSession {
    /// # Errors
    ///
    /// Returns `ReviewError::NothingToReview` if `items` is empty.
    pub fn new(items: Vec<IncorrectAnswer>, settings: ReviewSettings) -> Result<Self, ReviewError> {
        if items.is_empty() {
            return Err(ReviewError::NothingToReview);
        }
        Ok(Self {
            items,
            settings,
            index: 0,
            remaining_overall_secs: settings.overall_secs(),
            remaining_question_secs: settings.per_question_secs(),
            phase: ReviewPhase::Idle,
        })
    }

    #[must_use]
    pub fn phase(&self) -> ReviewPhase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == ReviewPhase::Complete
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[IncorrectAnswer] {
        &self.items
    }

    #[must_use]
    pub fn current(&self) -> Option<&IncorrectAnswer> {
        self.items.get(self.index)
    }

    #[must_use]
    pub fn remaining_overall_secs(&self) -> u32 {
        self.remaining_overall_secs
    }

    #[must_use]
    pub fn remaining_question_secs(&self) -> u32 {
        self.remaining_question_secs
    }

    /// # Errors
    ///
    /// Returns `ReviewError::Complete` if the review already ended. Starting
    /// twice is a no-op.
    pub fn start(&mut self) -> Result<(), ReviewError> {
        match self.phase {
            ReviewPhase::Complete => Err(ReviewError::Complete),
            ReviewPhase::Reviewing => Ok(()),
            ReviewPhase::Idle => {
                debug!("review started over {} questions", self.items.len());
                self.phase = ReviewPhase::Reviewing;
                Ok(())
            }
        }
    }

    /// One second of wall time: the overall budget and the per-question countdown.
    pub fn tick(&mut self) -> ReviewPhase {
        if self.phase != ReviewPhase::Reviewing {
            return self.phase;
        }
        self.tick_overall();
        if self.phase != ReviewPhase::Reviewing {
            return self.phase;
        }
        self.remaining_question_secs = self.remaining_question_secs.saturating_sub(1);
        if self.remaining_question_secs == 0 {
            self.tick_question();
        }
        self.phase
    }

    /// One second off the overall budget. Completes the review at zero.
    pub fn tick_overall(&mut self) {
        if self.phase != ReviewPhase::Reviewing {
            return;
        }
        self.remaining_overall_secs = self.remaining_overall_secs.saturating_sub(1);
        if self.remaining_overall_secs == 0 {
            debug!("review budget exhausted");
            self.phase = ReviewPhase::Complete;
        }
    }

    /// The per-question budget expired: show the next question, wrapping around.
    pub fn tick_question(&mut self) {
        if self.phase == ReviewPhase::Reviewing {
            self.rotate();
        }
    }

    /// Skip to the next question right away.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::NotStarted` before `start`, and
    /// `ReviewError::Complete` once the review has ended.
    pub fn next(&mut self) -> Result<usize, ReviewError> {
        match self.phase {
            ReviewPhase::Idle => Err(ReviewError::NotStarted),
            ReviewPhase::Complete => Err(ReviewError::Complete),
            ReviewPhase::Reviewing => {
                self.rotate();
                Ok(self.index)
            }
        }
    }

    pub fn end_early(&mut self) {
        if !self.is_complete() {
            debug!("review ended early at index {}", self.index);
        }
        self.phase = ReviewPhase::Complete;
    }

    fn rotate(&mut self) {
        self.index = (self.index + 1) % self.items.len();
        self.remaining_question_secs = self.settings.per_question_secs();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{Question, QuestionId};

    fn items(n: usize) -> Vec<IncorrectAnswer> {
        (0..n)
            .map(|i| IncorrectAnswer {
                index: i,
                question: Question::new(
                    QuestionId::generate(),
                    format!("Q{i}"),
                    vec!["a".into(), "b".into()],
                    "a",
                    None,
                )
                .unwrap(),
                chosen: "b".into(),
            })
            .collect()
    }

    fn started(n: usize, settings: ReviewSettings) -> ReviewSession {
        let mut review = ReviewSession::new(items(n), settings).unwrap();
        review.start().unwrap();
        review
    }

    #[test]
    fn empty_review_is_rejected() {
        let err = ReviewSession::new(Vec::new(), ReviewSettings::default()).unwrap_err();
        assert_eq!(err, ReviewError::NothingToReview);
    }

    #[test]
    fn ticks_before_start_do_nothing() {
        let mut review = ReviewSession::new(items(2), ReviewSettings::default()).unwrap();
        assert_eq!(review.tick(), ReviewPhase::Idle);
        review.tick_question();
        assert_eq!(review.next(), Err(ReviewError::NotStarted));
        assert_eq!(review.index(), 0);
        assert_eq!(review.remaining_overall_secs(), 1800);
    }

    #[test]
    fn n_question_ticks_return_to_start() {
        let mut review = started(4, ReviewSettings::default());
        for _ in 0..4 {
            review.tick_question();
        }
        assert_eq!(review.index(), 0);
        assert_eq!(review.phase(), ReviewPhase::Reviewing);
    }

    #[test]
    fn forty_five_seconds_visits_first_question_twice() {
        let mut review = started(3, ReviewSettings::default());
        let mut visited = vec![review.index()];
        for _ in 0..45 {
            review.tick();
            if review.remaining_question_secs() == 15 {
                visited.push(review.index());
            }
        }
        assert_eq!(visited, vec![0, 1, 2, 0]);
        assert_eq!(review.remaining_overall_secs(), 1800 - 45);
    }

    #[test]
    fn overall_budget_ends_the_review() {
        let settings = ReviewSettings::new(5, 2).unwrap();
        let mut review = started(2, settings);
        for _ in 0..4 {
            assert_eq!(review.tick(), ReviewPhase::Reviewing);
        }
        assert_eq!(review.tick(), ReviewPhase::Complete);
        assert_eq!(review.next(), Err(ReviewError::Complete));
        assert_eq!(review.start(), Err(ReviewError::Complete));
    }

    #[test]
    fn next_resets_question_countdown() {
        let mut review = started(2, ReviewSettings::new(60, 10).unwrap());
        for _ in 0..4 {
            review.tick();
        }
        assert_eq!(review.remaining_question_secs(), 6);
        assert_eq!(review.next(), Ok(1));
        assert_eq!(review.remaining_question_secs(), 10);
        assert_eq!(review.next(), Ok(0));
    }

    #[test]
    fn end_early_completes_immediately() {
        let mut review = started(2, ReviewSettings::default());
        review.end_early();
        assert!(review.is_complete());
        assert_eq!(review.tick(), ReviewPhase::Complete);
    }
}

use rand::rng;
use rand::seq::SliceRandom;

use study_core::model::{Question, SessionConfig};

/// Reported when the question file held fewer questions than the configured limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionNotice {
    pub requested: usize,
    pub available: usize,
}

/// Questions picked for one test.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionPlan {
    pub questions: Vec<Question>,
    pub notice: Option<SelectionNotice>,
}

impl QuestionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks the questions for a test from a parsed question set.
pub struct QuestionSelector<'a> {
    config: &'a SessionConfig,
    shuffle: bool,
}

impl<'a> QuestionSelector<'a> {
    #[must_use]
    pub fn new(config: &'a SessionConfig) -> Self {
        Self {
            config,
            shuffle: false,
        }
    }

    /// Enable or disable shuffling before the limit is applied.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Copy at most `question_limit` questions out of `available`.
    #[must_use]
    pub fn select(self, available: &[Question]) -> QuestionPlan {
        let mut questions = available.to_vec();
        if self.shuffle {
            questions.as_mut_slice().shuffle(&mut rng());
        }
        let take = self.config.effective_question_count(questions.len());
        questions.truncate(take);

        let requested = usize::try_from(self.config.question_limit()).unwrap_or(usize::MAX);
        let notice = (available.len() < requested).then_some(SelectionNotice {
            requested,
            available: available.len(),
        });

        QuestionPlan { questions, notice }
    }
}

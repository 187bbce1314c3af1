use serde::{Deserialize, Serialize};

/// Outcome of a submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerStatus {
    Correct,
    Incorrect,
}

/// A finalized answer for one question index. Never revised once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub chosen: String,
    pub status: AnswerStatus,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(chosen: impl Into<String>, status: AnswerStatus) -> Self {
        Self {
            chosen: chosen.into(),
            status,
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.status == AnswerStatus::Correct
    }
}

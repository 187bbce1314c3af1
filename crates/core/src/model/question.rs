use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::parser::is_marker_line;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("a question needs at least two options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {position} is empty")]
    EmptyOption { position: usize },

    #[error("option {position} spans more than one line")]
    MultiLineOption { position: usize },

    #[error("question text cannot contain a blank line")]
    BlankLineInText,

    #[error("question text line {line:?} reads as an option, answer or explanation")]
    MarkerLineInText { line: String },

    #[error("explanation cannot contain a blank line")]
    BlankLineInExplanation,

    #[error("correct answer does not match any option")]
    AnswerNotInOptions,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
///
/// The correct answer is stored by value, so reordering `options` never
/// invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: Option<String>,
}

impl Question {
    /// Creates a new question.
    ///
    /// Text, options, answer and explanation are trimmed. Whatever is left
    /// must be expressible as a block of a question file, so
    /// [`to_block`](Self::to_block) parses back to an equal question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank or has a line the file
    /// format would not read as text, fewer than two options are given, an
    /// option is blank or multi-line, the explanation has a blank line, or
    /// `correct_answer` is not one of the options.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        explanation: Option<String>,
    ) -> Result<Self, QuestionError> {
        let text = trimmed(text.into());
        let correct_answer = trimmed(correct_answer.into());
        let options: Vec<String> = options.into_iter().map(trimmed).collect();
        let explanation = explanation.map(trimmed);

        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if has_blank_line(&text) {
            return Err(QuestionError::BlankLineInText);
        }
        if let Some(line) = text.split('\n').find(|l| is_marker_line(l)) {
            return Err(QuestionError::MarkerLineInText {
                line: line.trim().to_owned(),
            });
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: options.len(),
            });
        }
        if let Some(position) = options.iter().position(String::is_empty) {
            return Err(QuestionError::EmptyOption {
                position: position + 1,
            });
        }
        if let Some(position) = options.iter().position(|o| o.contains('\n')) {
            return Err(QuestionError::MultiLineOption {
                position: position + 1,
            });
        }
        if explanation.as_deref().is_some_and(has_blank_line) {
            return Err(QuestionError::BlankLineInExplanation);
        }
        if !options.contains(&correct_answer) {
            return Err(QuestionError::AnswerNotInOptions);
        }

        Ok(Self {
            id,
            text,
            options,
            correct_answer,
            explanation,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Returns true if `choice` equals the correct answer.
    #[must_use]
    pub fn is_correct(&self, choice: &str) -> bool {
        choice == self.correct_answer
    }

    /// Returns true if `choice` is one of this question's options.
    #[must_use]
    pub fn has_option(&self, choice: &str) -> bool {
        self.options.iter().any(|o| o == choice)
    }

    /// 1-based key of the correct answer as it would appear in a question file.
    #[must_use]
    pub fn answer_key(&self) -> usize {
        self.options
            .iter()
            .position(|o| *o == self.correct_answer)
            .map_or(1, |i| i + 1)
    }

    /// Renders the question in the plain-text question file format.
    #[must_use]
    pub fn to_block(&self) -> String {
        let mut out = String::new();
        out.push_str(self.text.trim());
        out.push('\n');
        for (i, option) in self.options.iter().enumerate() {
            out.push_str(&format!("{}) {}\n", i + 1, option));
        }
        out.push_str(&format!("Answer: {}", self.answer_key()));
        if let Some(explanation) = &self.explanation {
            out.push('\n');
            if explanation.is_empty() {
                out.push_str("Explanation:");
            } else {
                out.push_str(&format!("Explanation: {explanation}"));
            }
        }
        out
    }
}

fn trimmed(s: String) -> String {
    if s.trim().len() == s.len() {
        s
    } else {
        s.trim().to_owned()
    }
}

// Whitespace-only lines separate blocks in a question file.
fn has_blank_line(s: &str) -> bool {
    s.split('\n').any(|line| line.trim().is_empty())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

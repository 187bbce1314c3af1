use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("roll number cannot be empty")]
    EmptyRollNo,

    #[error("name cannot be empty")]
    EmptyName,
}

/// The person taking a test, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    roll_no: String,
    name: String,
}

impl Learner {
    /// Creates a learner from trimmed roll number and name.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError` if either field is blank.
    pub fn new(roll_no: impl Into<String>, name: impl Into<String>) -> Result<Self, LearnerError> {
        let roll_no = roll_no.into().trim().to_owned();
        let name = name.into().trim().to_owned();
        if roll_no.is_empty() {
            return Err(LearnerError::EmptyRollNo);
        }
        if name.is_empty() {
            return Err(LearnerError::EmptyName);
        }
        Ok(Self { roll_no, name })
    }

    #[must_use]
    pub fn roll_no(&self) -> &str {
        &self.roll_no
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

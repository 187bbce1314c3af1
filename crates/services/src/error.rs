//! Shared error types for the services crate.

use std::fmt;

use thiserror::Error;

use study_core::model::{ConfigError, LicenseError, TestSummaryError};
use storage::repository::StorageError;

/// The step a caller has to send the user back to when a session cannot start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Login,
    Configure,
    UploadQuestions,
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Prerequisite::Login => "log in first",
            Prerequisite::Configure => "configure the test settings first",
            Prerequisite::UploadQuestions => "upload a question file first",
        };
        f.write_str(step)
    }
}

/// Errors emitted by the test session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot start the test: {0}")]
    Precondition(Prerequisite),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no questions available for session")]
    Empty,
    #[error("session already finished")]
    Finished,
    #[error("select an answer before submitting")]
    NoSelection,
    #[error("{0:?} is not an option for the current question")]
    UnknownOption(String),
    #[error("acknowledge the incorrect answer before continuing")]
    AwaitingAcknowledgement,
    #[error("there is no incorrect answer to acknowledge")]
    NothingToAcknowledge,
    #[error("session driver has stopped")]
    Closed,
}

impl SessionError {
    /// The step to redirect to, for errors that stop a session from starting.
    #[must_use]
    pub fn redirect(&self) -> Option<Prerequisite> {
        match self {
            SessionError::Precondition(step) => Some(*step),
            SessionError::Config(_) => Some(Prerequisite::Configure),
            SessionError::Empty => Some(Prerequisite::UploadQuestions),
            _ => None,
        }
    }
}

/// Errors emitted by the review session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReviewError {
    #[error("no incorrect answers to review")]
    NothingToReview,
    #[error("review has not started")]
    NotStarted,
    #[error("review already complete")]
    Complete,
}

/// Errors emitted by `LicenseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LicenseServiceError {
    #[error(transparent)]
    License(#[from] LicenseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while recording finished tests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultServiceError {
    #[error("session has not finished yet")]
    NotFinished,
    #[error("session has no learner to record the result for")]
    Anonymous,
    #[error(transparent)]
    Summary(#[from] TestSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

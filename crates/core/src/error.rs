use thiserror::Error;

use crate::model::{ConfigError, LearnerError, LicenseError, QuestionError, TestSummaryError};
use crate::parser::ParseError;

/// Any error the core crate can produce, for callers that don't care which.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Learner(#[from] LearnerError),
    #[error(transparent)]
    License(#[from] LicenseError),
    #[error(transparent)]
    Summary(#[from] TestSummaryError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

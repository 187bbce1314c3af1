mod answer;
mod config;
mod ids;
mod learner;
mod license;
mod question;
mod summary;

pub use ids::{ParseIdError, QuestionId};

pub use answer::{AnswerRecord, AnswerStatus};
pub use config::{
    ConfigError, DEFAULT_REVIEW_QUESTION_SECS, DEFAULT_REVIEW_SECS, ReviewSettings, SessionConfig,
};
pub use learner::{Learner, LearnerError};
pub use license::{DeviceId, LicenseError, LicenseKey};
pub use question::{Question, QuestionError};
pub use summary::{TestSummary, TestSummaryError};

use std::sync::Arc;

use log::{debug, warn};

use study_core::Clock;
use study_core::model::{Learner, Question, SessionConfig};
use storage::repository::{TestSummaryRepository, TestSummaryRow};

use super::plan::{QuestionSelector, SelectionNotice};
use super::result::TestResult;
use super::service::TestSession;
use crate::error::{Prerequisite, ResultServiceError, SessionError};

/// What the identity and configuration providers supplied for this attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub learner: Option<Learner>,
    pub config: Option<SessionConfig>,
}

impl SessionContext {
    #[must_use]
    pub fn new(learner: Option<Learner>, config: Option<SessionConfig>) -> Self {
        Self { learner, config }
    }
}

/// A running test and any note about how its questions were picked.
#[derive(Debug)]
pub struct LaunchedTest {
    pub session: TestSession,
    pub notice: Option<SelectionNotice>,
}

/// Checks prerequisites and starts test sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionLauncher {
    clock: Clock,
    shuffle: bool,
}

impl SessionLauncher {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            shuffle: false,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Start a test, or report the first missing prerequisite.
    ///
    /// Checks run in order: learner, config, questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Precondition` naming the step to go back to.
    pub fn launch(
        &self,
        ctx: &SessionContext,
        questions: &[Question],
    ) -> Result<LaunchedTest, SessionError> {
        let Some(learner) = ctx.learner.clone() else {
            return Err(SessionError::Precondition(Prerequisite::Login));
        };
        let config = match ctx.config {
            Some(config) if config.validate().is_ok() => config,
            _ => return Err(SessionError::Precondition(Prerequisite::Configure)),
        };
        if questions.is_empty() {
            return Err(SessionError::Precondition(Prerequisite::UploadQuestions));
        }

        let plan = QuestionSelector::new(&config)
            .with_shuffle(self.shuffle)
            .select(questions);
        if let Some(notice) = plan.notice {
            warn!(
                "only {} questions available, {} requested",
                notice.available, notice.requested
            );
        }
        debug!("launching test for roll no {}", learner.roll_no());

        let session =
            TestSession::start_with_clock(plan.questions, config, self.clock)?.with_learner(learner);
        Ok(LaunchedTest {
            session,
            notice: plan.notice,
        })
    }
}

/// Keeps the history of finished tests.
#[derive(Clone)]
pub struct ResultService {
    summaries: Arc<dyn TestSummaryRepository>,
}

impl ResultService {
    #[must_use]
    pub fn new(summaries: Arc<dyn TestSummaryRepository>) -> Self {
        Self { summaries }
    }

    /// Persist the summary of a finished session and return its id.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::NotFinished` for running sessions, or
    /// see [`ResultService::record_result`].
    pub async fn record(&self, session: &TestSession) -> Result<i64, ResultServiceError> {
        let result = session.result().ok_or(ResultServiceError::NotFinished)?;
        self.record_result(result).await
    }

    /// Persist a finished result and return its id.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Anonymous` when no learner is attached,
    /// or summary and storage errors.
    pub async fn record_result(&self, result: &TestResult) -> Result<i64, ResultServiceError> {
        let learner = result
            .learner
            .as_ref()
            .ok_or(ResultServiceError::Anonymous)?;
        let summary = result.to_summary(learner)?;
        let id = self.summaries.append_summary(&summary).await?;
        debug!("recorded test summary {id} for roll no {}", learner.roll_no());
        Ok(id)
    }

    /// Latest results first.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Storage` on repository failures.
    pub async fn history(
        &self,
        roll_no: Option<&str>,
        limit: u32,
    ) -> Result<Vec<TestSummaryRow>, ResultServiceError> {
        Ok(self.summaries.list_summaries(roll_no, limit).await?)
    }
}

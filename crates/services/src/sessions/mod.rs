mod driver;
mod plan;
mod progress;
mod result;
mod review;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{Prerequisite, ReviewError, SessionError};
pub use driver::{
    ReviewCommand, ReviewEvent, ReviewHandle, SessionEvent, SessionHandle, TICK, TestCommand,
    TestHandle, run_review, run_test, spawn_review, spawn_test,
};
pub use plan::{QuestionPlan, QuestionSelector, SelectionNotice};
pub use progress::SessionProgress;
pub use result::{IncorrectAnswer, TestResult, score_percentage};
pub use review::{ReviewPhase, ReviewSession};
pub use service::{SessionPhase, SubmitOutcome, TestSession, TickOutcome};
pub use workflow::{LaunchedTest, ResultService, SessionContext, SessionLauncher};

#![forbid(unsafe_code)]

pub mod error;
pub mod license_service;
pub mod sessions;

pub use study_core::Clock;

pub use error::{LicenseServiceError, Prerequisite, ResultServiceError, ReviewError, SessionError};
pub use license_service::{LicenseRequest, LicenseResponse, LicenseService};

pub use sessions::{
    IncorrectAnswer, LaunchedTest, ResultService, ReviewSession, SessionContext, SessionLauncher,
    SubmitOutcome, TestResult, TestSession,
};

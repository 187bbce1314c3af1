#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod parser;
pub mod time;

pub use error::Error;
pub use parser::{ParseDiagnostic, ParseError, ParseOutcome, Severity, parse, render_questions};
pub use time::Clock;

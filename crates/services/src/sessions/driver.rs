//! Async drivers that run a session against a one-second ticker.
//!
//! Each driver owns its `Interval`; the timer lives exactly as long as the
//! driver future. Closing the command channel, sending a quit command, or
//! dropping the future stops it.

use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use study_core::model::Question;

use super::result::{IncorrectAnswer, TestResult};
use super::review::ReviewSession;
use super::service::{SubmitOutcome, TestSession, TickOutcome};
use crate::error::SessionError;

/// Countdown granularity for both drivers.
pub const TICK: Duration = Duration::from_secs(1);

//
// ─── MESSAGES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestCommand {
    Select(String),
    Submit,
    Acknowledge,
    Skip,
    Finish,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A question is now on screen.
    Question {
        index: usize,
        question: Question,
        remaining_secs: u32,
    },
    Tick {
        remaining_secs: u32,
    },
    Selected(String),
    Answered(SubmitOutcome),
    Rejected(SessionError),
    Finished(TestResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Next,
    EndEarly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewEvent {
    Showing {
        index: usize,
        item: IncorrectAnswer,
        remaining_overall_secs: u32,
    },
    Tick {
        remaining_overall_secs: u32,
        remaining_question_secs: u32,
    },
    Complete,
}

//
// ─── TEST DRIVER ───────────────────────────────────────────────────────────────
//

/// Run `session` until it finishes or is abandoned, and hand it back.
///
/// A `Finished` event is sent only when the session actually finished.
pub async fn run_test(
    mut session: TestSession,
    mut commands: mpsc::Receiver<TestCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> TestSession {
    let mut ticker = ticker();
    announce_question(&session, &events);

    while !session.is_finished() {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                if let TickOutcome::Running { remaining_secs } = session.tick() {
                    emit(&events, SessionEvent::Tick { remaining_secs });
                }
            }
            command = commands.recv() => match command {
                None | Some(TestCommand::Quit) => {
                    debug!("test session abandoned");
                    return session;
                }
                Some(command) => apply_test_command(&mut session, command, &events),
            },
        }
    }

    if let Some(result) = session.result() {
        emit(&events, SessionEvent::Finished(result.clone()));
    }
    session
}

fn apply_test_command(
    session: &mut TestSession,
    command: TestCommand,
    events: &mpsc::UnboundedSender<SessionEvent>,
) {
    let moved_on = match command {
        TestCommand::Select(option) => session
            .select_answer(&option)
            .map(|()| {
                emit(events, SessionEvent::Selected(option));
                false
            }),
        TestCommand::Submit => session.submit_answer().map(|outcome| {
            let advanced = matches!(outcome, SubmitOutcome::Correct { .. });
            emit(events, SessionEvent::Answered(outcome));
            advanced
        }),
        TestCommand::Acknowledge => session.acknowledge_incorrect().map(|()| true),
        TestCommand::Skip => session.skip().map(|()| true),
        TestCommand::Finish => {
            session.finish();
            Ok(false)
        }
        // Handled by the driver loop.
        TestCommand::Quit => Ok(false),
    };

    match moved_on {
        Ok(true) => announce_question(session, events),
        Ok(false) => {}
        Err(err) => emit(events, SessionEvent::Rejected(err)),
    }
}

fn announce_question(session: &TestSession, events: &mpsc::UnboundedSender<SessionEvent>) {
    let Some(index) = session.current_index() else {
        return;
    };
    if let Some(question) = session.current_question() {
        emit(
            events,
            SessionEvent::Question {
                index,
                question: question.clone(),
                remaining_secs: session.remaining_secs(),
            },
        );
    }
}

//
// ─── REVIEW DRIVER ─────────────────────────────────────────────────────────────
//

/// Run `review` until its budget runs out or it is ended, and hand it back.
pub async fn run_review(
    mut review: ReviewSession,
    mut commands: mpsc::Receiver<ReviewCommand>,
    events: mpsc::UnboundedSender<ReviewEvent>,
) -> ReviewSession {
    if review.start().is_err() {
        emit(&events, ReviewEvent::Complete);
        return review;
    }
    let mut ticker = ticker();
    announce_item(&review, &events);

    while !review.is_complete() {
        tokio::select! {
            biased;
            _ = ticker.tick() => {
                let before = review.remaining_question_secs();
                review.tick();
                if review.is_complete() {
                    break;
                }
                if review.remaining_question_secs() >= before {
                    announce_item(&review, &events);
                } else {
                    emit(&events, ReviewEvent::Tick {
                        remaining_overall_secs: review.remaining_overall_secs(),
                        remaining_question_secs: review.remaining_question_secs(),
                    });
                }
            }
            command = commands.recv() => match command {
                Some(ReviewCommand::Next) => {
                    if review.next().is_ok() {
                        announce_item(&review, &events);
                    }
                }
                Some(ReviewCommand::EndEarly) => review.end_early(),
                None => {
                    debug!("review abandoned");
                    return review;
                }
            },
        }
    }

    emit(&events, ReviewEvent::Complete);
    review
}

fn announce_item(review: &ReviewSession, events: &mpsc::UnboundedSender<ReviewEvent>) {
    if let Some(item) = review.current() {
        emit(
            events,
            ReviewEvent::Showing {
                index: review.index(),
                item: item.clone(),
                remaining_overall_secs: review.remaining_overall_secs(),
            },
        );
    }
}

//
// ─── HANDLES ───────────────────────────────────────────────────────────────────
//

/// A driver running on its own task. Dropping the handle aborts the task.
pub struct SessionHandle<C, E, S> {
    commands: mpsc::Sender<C>,
    events: mpsc::UnboundedReceiver<E>,
    task: Option<JoinHandle<S>>,
}

pub type TestHandle = SessionHandle<TestCommand, SessionEvent, TestSession>;
pub type ReviewHandle = SessionHandle<ReviewCommand, ReviewEvent, ReviewSession>;

impl<C, E, S> SessionHandle<C, E, S> {
    /// # Errors
    ///
    /// Returns `SessionError::Closed` once the driver has stopped.
    pub async fn send(&self, command: C) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Next event, or `None` after the driver stopped and all events were read.
    pub async fn next_event(&mut self) -> Option<E> {
        self.events.recv().await
    }

    /// Wait for the driver to return its session.
    pub async fn join(mut self) -> Option<S> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl<C, E, S> Drop for SessionHandle<C, E, S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn [`run_test`] on the current runtime.
#[must_use]
pub fn spawn_test(session: TestSession) -> TestHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_test(session, command_rx, event_tx));
    SessionHandle {
        commands: command_tx,
        events: event_rx,
        task: Some(task),
    }
}

/// Spawn [`run_review`] on the current runtime.
#[must_use]
pub fn spawn_review(review: ReviewSession) -> ReviewHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run_review(review, command_rx, event_tx));
    SessionHandle {
        commands: command_tx,
        events: event_rx,
        task: Some(task),
    }
}

fn ticker() -> Interval {
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn emit<E>(events: &mpsc::UnboundedSender<E>, event: E) {
    // The receiver may already be gone.
    let _ = events.send(event);
}

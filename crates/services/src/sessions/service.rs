use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, info};

use study_core::Clock;
use study_core::model::{AnswerRecord, AnswerStatus, Learner, Question, SessionConfig};

use super::progress::SessionProgress;
use super::result::{IncorrectAnswer, TestResult, score_percentage};
use crate::error::SessionError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    Finished,
}

/// What happened when the current selection was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The answer was right; `finished` is true if that was the last question.
    Correct { finished: bool },
    /// The answer was wrong. The session waits for `acknowledge_incorrect`.
    Incorrect {
        correct_answer: String,
        explanation: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running { remaining_secs: u32 },
    TimedOut,
    /// The session had already finished; nothing changed.
    Idle,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt at a fixed question set.
///
/// Questions are asked in order. Skipped questions are queued and asked again,
/// once, after the last question. An incorrect answer holds the session until
/// it is acknowledged; the countdown keeps running meanwhile.
pub struct TestSession {
    questions: Vec<Question>,
    config: SessionConfig,
    learner: Option<Learner>,
    clock: Clock,
    current: usize,
    revisiting: bool,
    skipped: VecDeque<usize>,
    selection: Option<String>,
    pending_ack: Option<usize>,
    answers: BTreeMap<usize, AnswerRecord>,
    remaining_secs: u32,
    started_at: DateTime<Utc>,
    result: Option<TestResult>,
}

impl TestSession {
    /// Start a session over `questions`, truncated to the configured limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid config and
    /// `SessionError::Empty` if there are no questions.
    pub fn start(questions: Vec<Question>, config: SessionConfig) -> Result<Self, SessionError> {
        Self::start_with_clock(questions, config, Clock::default())
    }

    /// Like [`TestSession::start`], stamping times from `clock`.
    ///
    /// # Errors
    ///
    /// See [`TestSession::start`].
    pub fn start_with_clock(
        mut questions: Vec<Question>,
        config: SessionConfig,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        questions.truncate(config.effective_question_count(questions.len()));

        debug!(
            "test session started: {} questions, {}s",
            questions.len(),
            config.timer_secs()
        );
        Ok(Self {
            questions,
            config,
            learner: None,
            clock,
            current: 0,
            revisiting: false,
            skipped: VecDeque::new(),
            selection: None,
            pending_ack: None,
            answers: BTreeMap::new(),
            remaining_secs: config.timer_secs(),
            started_at: clock.now(),
            result: None,
        })
    }

    #[must_use]
    pub fn with_learner(mut self, learner: Learner) -> Self {
        self.learner = Some(learner);
        self
    }

    #[must_use]
    pub fn learner(&self) -> Option<&Learner> {
        self.learner.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.result.is_some() {
            SessionPhase::Finished
        } else {
            SessionPhase::Running
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, AnswerRecord> {
        &self.answers
    }

    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// Index of the incorrect answer awaiting acknowledgement, if any.
    #[must_use]
    pub fn pending_acknowledgement(&self) -> Option<usize> {
        self.pending_ack
    }

    /// Index of the question on screen; `None` once finished.
    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        if self.is_finished() {
            None
        } else {
            Some(self.current)
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.questions.get(i))
    }

    #[must_use]
    pub fn is_revisiting(&self) -> bool {
        self.revisiting
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            skipped: self.skipped.len(),
            is_complete: self.is_finished(),
        }
    }

    /// Running score over the full question count, as shown during the test.
    #[must_use]
    pub fn live_score_percentage(&self) -> u8 {
        let (correct, _) = self.counts();
        score_percentage(correct, self.total())
    }

    /// The final result, once the session has finished.
    #[must_use]
    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    //
    // ─── COMMANDS ──────────────────────────────────────────────────────────────
    //

    /// Choose an option for the current question. Replaces any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished`, `SessionError::AwaitingAcknowledgement`,
    /// or `SessionError::UnknownOption` without changing state.
    pub fn select_answer(&mut self, option: &str) -> Result<(), SessionError> {
        let question = self.ready_question()?;
        if !question.has_option(option) {
            return Err(SessionError::UnknownOption(option.to_string()));
        }
        self.selection = Some(option.to_string());
        Ok(())
    }

    /// Score the current selection and record it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished`, `SessionError::AwaitingAcknowledgement`,
    /// or `SessionError::NoSelection`.
    pub fn submit_answer(&mut self) -> Result<SubmitOutcome, SessionError> {
        let question = self.ready_question()?;
        let Some(chosen) = self.selection.clone() else {
            return Err(SessionError::NoSelection);
        };

        if question.is_correct(&chosen) {
            self.answers
                .insert(self.current, AnswerRecord::new(chosen, AnswerStatus::Correct));
            debug!("question {} answered correctly", self.current);
            self.advance();
            return Ok(SubmitOutcome::Correct {
                finished: self.is_finished(),
            });
        }

        let outcome = SubmitOutcome::Incorrect {
            correct_answer: question.correct_answer().to_string(),
            explanation: question.explanation().map(str::to_string),
        };
        self.answers
            .insert(self.current, AnswerRecord::new(chosen, AnswerStatus::Incorrect));
        self.pending_ack = Some(self.current);
        self.selection = None;
        debug!("question {} answered incorrectly", self.current);
        Ok(outcome)
    }

    /// Dismiss the explanation of an incorrect answer and move on.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` or `SessionError::NothingToAcknowledge`.
    pub fn acknowledge_incorrect(&mut self) -> Result<(), SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if self.pending_ack.take().is_none() {
            return Err(SessionError::NothingToAcknowledge);
        }
        self.advance();
        Ok(())
    }

    /// Defer the current question to the end of the test.
    ///
    /// A question skipped again while it is being revisited stays unanswered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` or `SessionError::AwaitingAcknowledgement`.
    pub fn skip(&mut self) -> Result<(), SessionError> {
        self.ready_question()?;
        if !self.revisiting {
            self.skipped.push_back(self.current);
        }
        debug!("question {} skipped", self.current);
        self.advance();
        Ok(())
    }

    /// One second of countdown. Reaching zero finishes the session.
    pub fn tick(&mut self) -> TickOutcome {
        if self.is_finished() {
            return TickOutcome::Idle;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Running {
                remaining_secs: self.remaining_secs,
            };
        }
        info!(
            "test timed out with {} of {} answered",
            self.answers.len(),
            self.questions.len()
        );
        self.complete(true);
        TickOutcome::TimedOut
    }

    /// Finish now. Later calls return the same result.
    pub fn finish(&mut self) -> &TestResult {
        self.complete(false)
    }

    /// Advance the stamp clock; only meaningful for fixed clocks in tests.
    pub fn advance_clock(&mut self, secs: i64) {
        self.clock.advance_secs(secs);
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn ready_question(&self) -> Result<&Question, SessionError> {
        if self.pending_ack.is_some() && !self.is_finished() {
            return Err(SessionError::AwaitingAcknowledgement);
        }
        self.current_question().ok_or(SessionError::Finished)
    }

    fn total(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    fn counts(&self) -> (u32, u32) {
        let correct = self.answers.values().filter(|r| r.is_correct()).count();
        let incorrect = self.answers.len() - correct;
        (
            u32::try_from(correct).unwrap_or(u32::MAX),
            u32::try_from(incorrect).unwrap_or(u32::MAX),
        )
    }

    fn advance(&mut self) {
        self.selection = None;
        if !self.revisiting {
            if self.current + 1 < self.questions.len() {
                self.current += 1;
                return;
            }
            self.revisiting = true;
        }
        while let Some(index) = self.skipped.pop_front() {
            if !self.answers.contains_key(&index) {
                self.current = index;
                return;
            }
        }
        self.complete(false);
    }

    fn complete(&mut self, timed_out: bool) -> &TestResult {
        let result = match self.result.take() {
            Some(existing) => existing,
            None => {
                let result = self.build_result(timed_out);
                debug!(
                    "test finished: {}/{} correct, {}%",
                    result.correct, result.total, result.score_percentage
                );
                result
            }
        };
        self.result.insert(result)
    }

    fn build_result(&self, timed_out: bool) -> TestResult {
        let (correct, incorrect) = self.counts();
        let total = self.total();
        let score = score_percentage(correct, total);
        let incorrect_answers = self
            .answers
            .iter()
            .filter(|(_, record)| !record.is_correct())
            .filter_map(|(&index, record)| {
                self.questions.get(index).map(|question| IncorrectAnswer {
                    index,
                    question: question.clone(),
                    chosen: record.chosen.clone(),
                })
            })
            .collect();

        TestResult {
            learner: self.learner.clone(),
            total,
            correct,
            incorrect,
            unanswered: total - correct - incorrect,
            score_percentage: score,
            passed: score >= self.config.passing_percentage(),
            timed_out,
            unacknowledged: if timed_out { self.pending_ack } else { None },
            incorrect_answers,
            started_at: self.started_at,
            completed_at: self.clock.now(),
        }
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("skipped", &self.skipped)
            .field("pending_ack", &self.pending_ack)
            .field("remaining_secs", &self.remaining_secs)
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::QuestionId;
    use study_core::time::{fixed_clock, fixed_now};

    fn question(n: usize) -> Question {
        Question::new(
            QuestionId::generate(),
            format!("Q{n}"),
            vec!["right".to_string(), "wrong".to_string()],
            "right",
            Some(format!("because {n}")),
        )
        .unwrap()
    }

    fn questions(n: usize) -> Vec<Question> {
        (1..=n).map(question).collect()
    }

    fn session(n: usize, timer: u32, limit: u32) -> TestSession {
        let config = SessionConfig::new(timer, limit, 70).unwrap();
        TestSession::start_with_clock(questions(n), config, fixed_clock()).unwrap()
    }

    fn answer(session: &mut TestSession, option: &str) -> SubmitOutcome {
        session.select_answer(option).unwrap();
        session.submit_answer().unwrap()
    }

    #[test]
    fn start_rejects_empty_question_list() {
        let err = TestSession::start(Vec::new(), SessionConfig::default()).unwrap_err();
        assert_eq!(err, SessionError::Empty);
    }

    #[test]
    fn start_truncates_to_question_limit() {
        let s = session(8, 60, 5);
        assert_eq!(s.questions().len(), 5);
        assert_eq!(s.remaining_secs(), 60);
        assert_eq!(s.current_index(), Some(0));
    }

    #[test]
    fn four_right_one_wrong_passes_with_eighty() {
        let mut s = session(5, 60, 5);
        for _ in 0..4 {
            assert_eq!(answer(&mut s, "right"), SubmitOutcome::Correct { finished: false });
        }
        let outcome = answer(&mut s, "wrong");
        assert_eq!(
            outcome,
            SubmitOutcome::Incorrect {
                correct_answer: "right".into(),
                explanation: Some("because 5".into()),
            }
        );
        assert!(!s.is_finished());
        s.acknowledge_incorrect().unwrap();

        let result = s.result().unwrap();
        assert_eq!(result.total, 5);
        assert_eq!(result.correct, 4);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.score_percentage, 80);
        assert!(result.passed);
        assert!(!result.timed_out);
        assert_eq!(result.incorrect_answers.len(), 1);
        assert_eq!(result.incorrect_answers[0].index, 4);
        assert_eq!(result.incorrect_answers[0].chosen, "wrong");
        assert_eq!(result.completed_at, fixed_now());
    }

    #[test]
    fn timeout_after_two_answers_counts_unreached_against_score() {
        let mut s = session(5, 3, 5);
        answer(&mut s, "right");
        answer(&mut s, "right");
        assert_eq!(s.tick(), TickOutcome::Running { remaining_secs: 2 });
        assert_eq!(s.tick(), TickOutcome::Running { remaining_secs: 1 });
        assert_eq!(s.tick(), TickOutcome::TimedOut);

        let result = s.result().unwrap();
        assert_eq!(result.correct, 2);
        assert_eq!(result.incorrect, 0);
        assert_eq!(result.unanswered, 3);
        assert_eq!(result.score_percentage, 40);
        assert!(!result.passed);
        assert!(result.timed_out);
        assert!(result.incorrect_answers.is_empty());
        assert_eq!(s.tick(), TickOutcome::Idle);
    }

    #[test]
    fn timeout_wins_over_pending_acknowledgement() {
        let mut s = session(3, 1, 3);
        answer(&mut s, "wrong");
        assert_eq!(s.pending_acknowledgement(), Some(0));
        assert_eq!(s.tick(), TickOutcome::TimedOut);

        let result = s.result().unwrap();
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.unacknowledged, Some(0));
        assert_eq!(result.incorrect_answers[0].index, 0);
        assert_eq!(s.acknowledge_incorrect(), Err(SessionError::Finished));
    }

    #[test]
    fn finish_is_idempotent() {
        let mut s = session(3, 60, 3);
        answer(&mut s, "right");
        let first = s.finish().clone();
        s.advance_clock(30);
        let second = s.finish().clone();
        assert_eq!(first, second);
        assert_eq!(s.tick(), TickOutcome::Idle);

        // Last-question path after an explicit finish must not rescore.
        assert_eq!(s.select_answer("right"), Err(SessionError::Finished));
    }

    #[test]
    fn acknowledgement_blocks_other_commands() {
        let mut s = session(2, 60, 2);
        answer(&mut s, "wrong");
        assert_eq!(
            s.select_answer("right"),
            Err(SessionError::AwaitingAcknowledgement)
        );
        assert_eq!(s.submit_answer(), Err(SessionError::AwaitingAcknowledgement));
        assert_eq!(s.skip(), Err(SessionError::AwaitingAcknowledgement));
        s.acknowledge_incorrect().unwrap();
        assert_eq!(s.current_index(), Some(1));
        assert_eq!(
            s.acknowledge_incorrect(),
            Err(SessionError::NothingToAcknowledge)
        );
    }

    #[test]
    fn submit_requires_a_known_selection() {
        let mut s = session(2, 60, 2);
        assert_eq!(s.submit_answer(), Err(SessionError::NoSelection));
        assert_eq!(
            s.select_answer("maybe"),
            Err(SessionError::UnknownOption("maybe".into()))
        );
        s.select_answer("wrong").unwrap();
        s.select_answer("right").unwrap();
        assert_eq!(s.selection(), Some("right"));
        assert_eq!(
            s.submit_answer().unwrap(),
            SubmitOutcome::Correct { finished: false }
        );
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn skipped_questions_are_revisited_in_order() {
        let mut s = session(4, 60, 4);
        s.skip().unwrap();
        answer(&mut s, "right");
        s.skip().unwrap();
        answer(&mut s, "right");

        assert!(s.is_revisiting());
        assert_eq!(s.current_index(), Some(0));
        assert_eq!(s.progress().skipped, 1);
        answer(&mut s, "right");
        assert_eq!(s.current_index(), Some(2));
        assert_eq!(
            answer(&mut s, "right"),
            SubmitOutcome::Correct { finished: true }
        );
        assert_eq!(s.result().unwrap().correct, 4);
    }

    #[test]
    fn skipping_during_revisit_leaves_question_unanswered() {
        let mut s = session(2, 60, 2);
        s.skip().unwrap();
        answer(&mut s, "right");
        assert_eq!(s.current_index(), Some(0));
        s.skip().unwrap();

        let result = s.result().unwrap();
        assert_eq!(result.correct, 1);
        assert_eq!(result.unanswered, 1);
        assert_eq!(result.score_percentage, 50);
    }

    #[test]
    fn counts_never_exceed_total() {
        let mut s = session(4, 60, 4);
        answer(&mut s, "right");
        answer(&mut s, "wrong");
        s.acknowledge_incorrect().unwrap();
        let progress = s.progress();
        assert_eq!(progress.answered, 2);
        assert_eq!(progress.remaining, 2);
        assert_eq!(s.live_score_percentage(), 25);

        let result = s.finish();
        assert!(result.correct + result.incorrect < result.total);

        let mut full = session(2, 60, 2);
        answer(&mut full, "right");
        answer(&mut full, "right");
        let result = full.result().unwrap();
        assert_eq!(result.correct + result.incorrect, result.total);
        assert!(full.progress().is_complete);
    }
}

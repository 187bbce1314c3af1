use std::io;

use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use services::sessions::{
    ReviewCommand, ReviewEvent, SessionEvent, SubmitOutcome, TestCommand, spawn_review,
    spawn_test,
};
use services::{ReviewSession, TestResult, TestSession};
use study_core::model::Question;

pub type InputLines = Lines<BufReader<Stdin>>;

#[must_use]
pub fn stdin_lines() -> InputLines {
    BufReader::new(tokio::io::stdin()).lines()
}

/// One line typed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TestInput {
    Choose(usize),
    Continue,
    Skip,
    Finish,
    Quit,
    Unknown,
}

impl TestInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Ok(n) = line.parse::<usize>() {
            return Self::Choose(n);
        }
        match line.to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Self::Continue,
            "s" | "skip" => Self::Skip,
            "f" | "finish" => Self::Finish,
            "q" | "quit" => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

/// Map a line of input to driver commands, given what is on screen.
fn test_commands(
    input: TestInput,
    current: Option<&Question>,
    awaiting_ack: bool,
) -> Vec<TestCommand> {
    match input {
        TestInput::Continue if awaiting_ack => vec![TestCommand::Acknowledge],
        TestInput::Choose(n) if !awaiting_ack => current
            .and_then(|q| n.checked_sub(1).and_then(|i| q.options().get(i)))
            .map(|option| vec![TestCommand::Select(option.clone()), TestCommand::Submit])
            .unwrap_or_default(),
        TestInput::Skip => vec![TestCommand::Skip],
        TestInput::Finish => vec![TestCommand::Finish],
        TestInput::Quit => vec![TestCommand::Quit],
        _ => Vec::new(),
    }
}

fn print_question(index: usize, question: &Question, remaining_secs: u32, total: usize) {
    println!();
    println!("[{}/{total}] {}s left", index + 1, remaining_secs);
    println!("{}", question.text());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}) {option}", i + 1);
    }
    println!("answer with a number, s to skip, f to finish, q to quit");
}

/// Run a test on the terminal. `None` means the learner quit.
pub async fn take_test(
    session: TestSession,
    lines: &mut InputLines,
) -> io::Result<Option<TestResult>> {
    let total = session.questions().len();
    let mut handle = spawn_test(session);
    let mut current: Option<Question> = None;
    let mut awaiting_ack = false;
    let mut input_open = true;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(SessionEvent::Question { index, question, remaining_secs }) => {
                    print_question(index, &question, remaining_secs, total);
                    current = Some(question);
                    awaiting_ack = false;
                }
                Some(SessionEvent::Tick { remaining_secs }) => {
                    if remaining_secs <= 10 || remaining_secs % 60 == 0 {
                        println!("{remaining_secs}s left");
                    }
                }
                Some(SessionEvent::Selected(_)) => {}
                Some(SessionEvent::Answered(SubmitOutcome::Correct { .. })) => println!("correct"),
                Some(SessionEvent::Answered(SubmitOutcome::Incorrect { correct_answer, explanation })) => {
                    println!("incorrect, the answer is: {correct_answer}");
                    if let Some(explanation) = explanation.filter(|e| !e.is_empty()) {
                        println!("{explanation}");
                    }
                    println!("press enter to continue");
                    awaiting_ack = true;
                }
                Some(SessionEvent::Rejected(err)) => println!("{err}"),
                Some(SessionEvent::Finished(result)) => return Ok(Some(result)),
                None => return Ok(None),
            },
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    debug!("stdin closed; waiting for the countdown");
                    input_open = false;
                    continue;
                };
                let commands = test_commands(TestInput::parse(&line), current.as_ref(), awaiting_ack);
                if commands.is_empty() {
                    println!("?");
                }
                for command in commands {
                    let quitting = command == TestCommand::Quit;
                    if handle.send(command).await.is_err() || quitting {
                        return Ok(handle.join().await.and_then(|s| s.result().cloned()));
                    }
                }
            }
        }
    }
}

pub fn print_result(result: &TestResult) {
    println!();
    if result.timed_out {
        println!("time is up");
    }
    println!(
        "score: {}% ({} correct, {} incorrect, {} unanswered of {})",
        result.score_percentage, result.correct, result.incorrect, result.unanswered, result.total
    );
    println!("{}", if result.passed { "passed" } else { "not passed" });
}

/// Cycle through missed questions until the budget runs out or `q` is typed.
pub async fn review(review: ReviewSession, lines: &mut InputLines) -> io::Result<()> {
    println!();
    println!(
        "reviewing {} missed questions; enter for next, q to stop",
        review.len()
    );
    let mut handle = spawn_review(review);
    let mut input_open = true;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(ReviewEvent::Showing { index, item, remaining_overall_secs }) => {
                    println!();
                    println!("[review {}] {}s left", index + 1, remaining_overall_secs);
                    println!("{}", item.question.text());
                    println!("  you chose: {}", item.chosen);
                    println!("  answer:    {}", item.question.correct_answer());
                    if let Some(explanation) = item.question.explanation().filter(|e| !e.is_empty()) {
                        println!("  {explanation}");
                    }
                }
                Some(ReviewEvent::Tick { .. }) => {}
                Some(ReviewEvent::Complete) | None => return Ok(()),
            },
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    input_open = false;
                    continue;
                };
                let command = match line.trim().to_ascii_lowercase().as_str() {
                    "q" | "quit" | "end" => ReviewCommand::EndEarly,
                    _ => ReviewCommand::Next,
                };
                if handle.send(command).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

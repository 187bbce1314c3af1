//! Parser for plain-text question files.
//!
//! A file is a sequence of blocks separated by one or more blank lines:
//!
//! ```text
//! Which planet is largest?
//! 1) Mars
//! 2) Jupiter
//! Answer: 2
//! Explanation: Jupiter is more than twice as massive as the others combined.
//! ```
//!
//! Each block is scanned independently. A malformed block is dropped and
//! reported through a [`ParseDiagnostic`]; it never aborts the rest of the file.

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::model::{Question, QuestionError, QuestionId};

const ANSWER_LABEL: &str = "answer:";
const EXPLANATION_LABEL: &str = "explanation:";

//
// ─── DIAGNOSTICS ───────────────────────────────────────────────────────────────
//

/// Reasons a block is dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockError {
    #[error("missing question text")]
    MissingQuestionText,

    #[error("must have at least two valid options")]
    TooFewOptions,

    #[error("missing or invalid 'Answer:' line (e.g. Answer: 2)")]
    MissingAnswer,

    #[error("answer key {0} does not correspond to a valid option")]
    UnknownAnswerKey(u32),

    #[error(transparent)]
    Invalid(#[from] QuestionError),
}

/// Problems that leave the block usable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockWarning {
    #[error("option {key} has no text and was skipped")]
    EmptyOption { key: u32 },

    #[error("option {key} is listed more than once; the later text wins")]
    DuplicateOption { key: u32 },

    #[error("extra 'Answer: {key}' line ignored; the first answer line wins")]
    DuplicateAnswer { key: u32 },

    #[error("ignoring unexpected line after options: {line:?}")]
    UnexpectedLine { line: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Warning(BlockWarning),
    Error(BlockError),
}

/// A non-fatal finding attached to one block (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    pub block: usize,
    pub kind: DiagnosticKind,
}

impl ParseDiagnostic {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.kind {
            DiagnosticKind::Warning(_) => Severity::Warning,
            DiagnosticKind::Error(_) => Severity::Error,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    #[must_use]
    pub fn message(&self) -> String {
        match &self.kind {
            DiagnosticKind::Warning(w) => w.to_string(),
            DiagnosticKind::Error(e) => e.to_string(),
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "block {}: {level}: {}", self.block, self.message())
    }
}

/// Batch-level failure: nothing usable came out of the file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("the question file is empty")]
    EmptyInput,

    #[error("no valid questions found in {blocks} block(s)")]
    NoValidQuestions {
        blocks: usize,
        diagnostics: Vec<ParseDiagnostic>,
    },
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Everything a parse produced: questions in block order plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    questions: Vec<Question>,
    diagnostics: Vec<ParseDiagnostic>,
    block_count: usize,
}

impl ParseOutcome {
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// Number of non-empty blocks found in the input.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Number of blocks that were rejected.
    #[must_use]
    pub fn dropped_blocks(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.block)
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<Question>, Vec<ParseDiagnostic>) {
        (self.questions, self.diagnostics)
    }

    /// Returns the parsed questions, or why there are none.
    ///
    /// # Errors
    ///
    /// `ParseError::EmptyInput` when the text had no blocks at all,
    /// `ParseError::NoValidQuestions` when every block was rejected.
    pub fn into_questions(self) -> Result<Vec<Question>, ParseError> {
        if self.block_count == 0 {
            return Err(ParseError::EmptyInput);
        }
        if self.questions.is_empty() {
            return Err(ParseError::NoValidQuestions {
                blocks: self.block_count,
                diagnostics: self.diagnostics,
            });
        }
        Ok(self.questions)
    }
}

//
// ─── PARSING ───────────────────────────────────────────────────────────────────
//

/// Parses question file content.
#[must_use]
pub fn parse(text: &str) -> ParseOutcome {
    let normalized = text.replace("\r\n", "\n");
    let blocks = split_blocks(&normalized);

    let mut questions = Vec::with_capacity(blocks.len());
    let mut diagnostics = Vec::new();

    for (index, lines) in blocks.iter().enumerate() {
        let block = index + 1;
        let scanned = scan_block(lines);

        for warning in &scanned.warnings {
            warn!("block {block}: {warning}");
        }
        diagnostics.extend(scanned.warnings.iter().cloned().map(|w| ParseDiagnostic {
            block,
            kind: DiagnosticKind::Warning(w),
        }));

        match scanned.into_question() {
            Ok(question) => questions.push(question),
            Err(errors) => {
                error!("dropping block {block}: {errors:?}");
                debug!("rejected block {block} content:\n{}", lines.join("\n"));
                diagnostics.extend(errors.into_iter().map(|e| ParseDiagnostic {
                    block,
                    kind: DiagnosticKind::Error(e),
                }));
            }
        }
    }

    if questions.is_empty() && !blocks.is_empty() {
        warn!(
            "no valid questions parsed from {} block(s); check the question format",
            blocks.len()
        );
    } else if !questions.is_empty() {
        info!("parsed {} question(s)", questions.len());
    }

    ParseOutcome {
        questions,
        diagnostics,
        block_count: blocks.len(),
    }
}

/// Renders questions back into the file format, one block per question.
#[must_use]
pub fn render_questions(questions: &[Question]) -> String {
    let mut out = questions
        .iter()
        .map(Question::to_block)
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Groups lines into blocks; whitespace-only lines separate blocks.
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Unknown,
    Question,
    Options,
    Answer,
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Explanation(&'a str),
    Answer(u32),
    Option { key: u32, text: &'a str },
    Other,
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let n = label.len();
    if line.len() >= n && line.is_char_boundary(n) && line[..n].eq_ignore_ascii_case(label) {
        Some(&line[n..])
    } else {
        None
    }
}

/// True if `line` would be read as an option, answer or explanation line.
pub(crate) fn is_marker_line(line: &str) -> bool {
    classify(line.trim()) != Line::Other
}

fn classify(trimmed: &str) -> Line<'_> {
    if let Some(rest) = strip_label(trimmed, EXPLANATION_LABEL) {
        return Line::Explanation(rest.trim());
    }

    if let Some(rest) = strip_label(trimmed, ANSWER_LABEL) {
        let digits = rest.trim_start();
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(key) = digits.parse() {
                return Line::Answer(key);
            }
        }
    }

    let digit_len = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if digit_len > 0 && trimmed[digit_len..].starts_with(')') {
        if let Ok(key) = trimmed[..digit_len].parse() {
            return Line::Option {
                key,
                text: trimmed[digit_len + 1..].trim(),
            };
        }
    }

    Line::Other
}

#[derive(Debug, Default)]
struct ScannedBlock {
    question_lines: Vec<String>,
    options: Vec<(u32, String)>,
    answer: Option<u32>,
    explanation: Option<String>,
    warnings: Vec<BlockWarning>,
}

fn scan_block(lines: &[&str]) -> ScannedBlock {
    let mut scanned = ScannedBlock::default();
    let mut state = ScanState::Unknown;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match classify(trimmed) {
            Line::Explanation(first) => {
                // Everything from the label to the end of the block is explanation.
                let mut parts = Vec::new();
                if !first.is_empty() {
                    parts.push(first);
                }
                parts.extend(lines[i + 1..].iter().copied());
                scanned.explanation = Some(parts.join("\n").trim().to_owned());
                break;
            }
            Line::Answer(key) => {
                state = ScanState::Answer;
                if scanned.answer.is_none() {
                    scanned.answer = Some(key);
                } else {
                    scanned.warnings.push(BlockWarning::DuplicateAnswer { key });
                }
            }
            Line::Option { key, text } => {
                state = ScanState::Options;
                if text.is_empty() {
                    scanned.warnings.push(BlockWarning::EmptyOption { key });
                } else if let Some(slot) = scanned.options.iter_mut().find(|(k, _)| *k == key) {
                    scanned.warnings.push(BlockWarning::DuplicateOption { key });
                    slot.1 = text.to_owned();
                } else {
                    scanned.options.push((key, text.to_owned()));
                }
            }
            Line::Other => match state {
                ScanState::Unknown | ScanState::Question => {
                    state = ScanState::Question;
                    scanned.question_lines.push((*line).to_owned());
                }
                ScanState::Options | ScanState::Answer => {
                    scanned.warnings.push(BlockWarning::UnexpectedLine {
                        line: trimmed.to_owned(),
                    });
                }
            },
        }
    }

    scanned
}

impl ScannedBlock {
    fn into_question(self) -> Result<Question, Vec<BlockError>> {
        let text = self.question_lines.join("\n").trim().to_owned();
        let correct = self
            .answer
            .and_then(|key| self.options.iter().find(|(k, _)| *k == key))
            .map(|(_, text)| text.clone());

        let mut errors = Vec::new();
        if text.is_empty() {
            errors.push(BlockError::MissingQuestionText);
        }
        if self.options.len() < 2 {
            errors.push(BlockError::TooFewOptions);
        }
        match (self.answer, &correct) {
            (None, _) => errors.push(BlockError::MissingAnswer),
            (Some(key), None) => errors.push(BlockError::UnknownAnswerKey(key)),
            (Some(_), Some(_)) => {}
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let options = self.options.into_iter().map(|(_, text)| text).collect();
        Question::new(
            QuestionId::generate(),
            text,
            options,
            correct.unwrap_or_default(),
            self.explanation,
        )
        .map_err(|e| vec![BlockError::from(e)])
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BLOCKS: &str = "\
What is 2 + 2?
1) 3
2) 4
3) 5
4) 22
Answer: 2
Explanation: Basic addition.

Capital of France?
1) Berlin
2) Madrid
3) Paris
4) Rome
Answer: 3
";

    #[test]
    fn parses_two_well_formed_blocks() {
        let outcome = parse(TWO_BLOCKS);
        assert_eq!(outcome.block_count(), 2);
        assert!(outcome.diagnostics().is_empty());
        let qs = outcome.questions();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].text(), "What is 2 + 2?");
        assert_eq!(qs[0].options().len(), 4);
        assert_eq!(qs[0].correct_answer(), "4");
        assert_eq!(qs[0].explanation(), Some("Basic addition."));
        assert_eq!(qs[1].correct_answer(), "Paris");
        assert_eq!(qs[1].explanation(), None);
        assert_ne!(qs[0].id(), qs[1].id());
    }

    #[test]
    fn single_option_block_is_dropped_with_diagnostic() {
        let outcome = parse("Lonely?\n1) foo\nAnswer: 1\n");
        assert!(outcome.questions().is_empty());
        assert_eq!(outcome.dropped_blocks(), 1);
        let messages: Vec<_> = outcome.errors().map(ParseDiagnostic::message).collect();
        assert!(messages.contains(&"must have at least two valid options".to_string()));
    }

    #[test]
    fn bad_block_does_not_abort_batch() {
        let text = "Good?\n1) a\n2) b\nAnswer: 1\n\nNo answer here\n1) a\n2) b\n\nAlso good\n1) x\n2) y\nAnswer: 2";
        let outcome = parse(text);
        assert_eq!(outcome.block_count(), 3);
        assert_eq!(outcome.questions().len(), 2);
        assert_eq!(outcome.dropped_blocks(), 1);
        assert_eq!(outcome.errors().next().unwrap().block, 2);
        assert_eq!(outcome.questions()[1].text(), "Also good");
    }

    #[test]
    fn reports_every_failure_reason_of_a_block() {
        let outcome = parse("1) only\nAnswer: 7");
        let errors: Vec<_> = outcome
            .errors()
            .map(|d| match &d.kind {
                DiagnosticKind::Error(e) => e.clone(),
                DiagnosticKind::Warning(_) => unreachable!(),
            })
            .collect();
        assert_eq!(
            errors,
            vec![
                BlockError::MissingQuestionText,
                BlockError::TooFewOptions,
                BlockError::UnknownAnswerKey(7),
            ]
        );
    }

    #[test]
    fn normalizes_crlf_and_whitespace_only_separators() {
        let text = "Q1\r\n1) a\r\n2) b\r\nAnswer: 1\r\n   \r\nQ2\r\n1) c\r\n2) d\r\nanswer: 2\r\n";
        let outcome = parse(text);
        assert_eq!(outcome.block_count(), 2);
        assert_eq!(outcome.questions().len(), 2);
        assert_eq!(outcome.questions()[1].correct_answer(), "d");
    }

    #[test]
    fn multi_line_question_text_keeps_line_breaks() {
        let outcome = parse("Consider the code:\n  let x = 5;\nWhat is x?\n1) 5\n2) 6\nAnswer: 1");
        assert_eq!(
            outcome.questions()[0].text(),
            "Consider the code:\n  let x = 5;\nWhat is x?"
        );
    }

    #[test]
    fn duplicate_option_key_overwrites_in_place() {
        let outcome = parse("Q\n1) first\n2) second\n1) replaced\nAnswer: 1");
        let q = &outcome.questions()[0];
        assert_eq!(q.options(), ["replaced".to_string(), "second".to_string()]);
        assert_eq!(q.correct_answer(), "replaced");
        assert!(matches!(
            outcome.warnings().next().unwrap().kind,
            DiagnosticKind::Warning(BlockWarning::DuplicateOption { key: 1 })
        ));
    }

    #[test]
    fn empty_option_text_is_dropped_with_warning() {
        let outcome = parse("Q\n1) a\n2)\n3) c\nAnswer: 3");
        let q = &outcome.questions()[0];
        assert_eq!(q.options().len(), 2);
        assert_eq!(outcome.warnings().count(), 1);
    }

    #[test]
    fn first_answer_line_wins() {
        let outcome = parse("Q\n1) a\n2) b\nAnswer: 2\nANSWER: 1");
        assert_eq!(outcome.questions()[0].correct_answer(), "b");
        assert_eq!(outcome.warnings().count(), 1);
    }

    #[test]
    fn stray_line_after_options_is_ignored() {
        let outcome = parse("Q\n1) a\n2) b\nsomething odd\nAnswer: 1");
        assert_eq!(outcome.questions()[0].text(), "Q");
        assert!(matches!(
            &outcome.warnings().next().unwrap().kind,
            DiagnosticKind::Warning(BlockWarning::UnexpectedLine { line }) if line == "something odd"
        ));
    }

    #[test]
    fn explanation_consumes_rest_of_block() {
        let outcome = parse("Q\n1) a\n2) b\nexplanation: because\n3) not an option\nAnswer: 2\nAnswer: 1");
        // The answer lines come after the label, so they are explanation text.
        assert!(outcome.questions().is_empty());
        assert!(outcome.errors().any(|d| d.kind == DiagnosticKind::Error(BlockError::MissingAnswer)));

        let outcome = parse("Q\n1) a\n2) b\nAnswer: 2\nExplanation:\nline one\nline two");
        assert_eq!(
            outcome.questions()[0].explanation(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn bare_explanation_label_is_empty_not_absent() {
        let outcome = parse("Q\n1) a\n2) b\nAnswer: 2\nExplanation:");
        assert_eq!(outcome.questions()[0].explanation(), Some(""));
    }

    #[test]
    fn answer_with_trailing_text_is_not_an_answer() {
        let outcome = parse("Q\n1) a\n2) b\nAnswer: 2 (b)");
        assert!(outcome.questions().is_empty());
        assert!(outcome.errors().any(|d| d.kind == DiagnosticKind::Error(BlockError::MissingAnswer)));
    }

    #[test]
    fn file_without_blank_lines_is_one_block() {
        let outcome = parse("Q1\n1) a\n2) b\nAnswer: 1\nQ2\n1) c\n2) d\nAnswer: 2");
        assert_eq!(outcome.block_count(), 1);
        assert_eq!(outcome.questions().len(), 1);
    }

    #[test]
    fn empty_input_differs_from_all_invalid() {
        assert_eq!(parse("  \n\n \r\n").into_questions(), Err(ParseError::EmptyInput));
        let err = parse("nothing useful here").into_questions().unwrap_err();
        assert!(matches!(err, ParseError::NoValidQuestions { blocks: 1, .. }));
    }

    #[test]
    fn kept_plus_dropped_equals_block_count() {
        let text = "A\n1) x\n2) y\nAnswer: 1\n\nB\n1) x\nAnswer: 1\n\nC\n1) x\n2) y\nAnswer: 9\n\nD\n1) x\n2) y\nAnswer: 2";
        let outcome = parse(text);
        assert_eq!(
            outcome.questions().len() + outcome.dropped_blocks(),
            outcome.block_count()
        );
    }

    #[test]
    fn rendered_questions_parse_back_equivalently() {
        let original = parse(TWO_BLOCKS).into_questions().unwrap();
        let reparsed = parse(&render_questions(&original)).into_questions().unwrap();
        assert_eq!(original.len(), reparsed.len());
        for (a, b) in original.iter().zip(&reparsed) {
            assert_eq!(a.text(), b.text());
            assert_eq!(a.options(), b.options());
            assert_eq!(a.correct_answer(), b.correct_answer());
            assert_eq!(a.explanation(), b.explanation());
            assert_ne!(a.id(), b.id());
        }
    }

    #[test]
    fn constructed_questions_survive_a_file_round_trip() {
        let opts = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        let constructed = [
            Question::new(QuestionId::generate(), "Q", opts(&[" a", "b "]), " a", None),
            Question::new(
                QuestionId::generate(),
                "Consider:\n    let x = 5;\nWhat is x?",
                opts(&["5", "6", "7"]),
                "7",
                Some("Shadowing aside,\nx is 5.".into()),
            ),
            Question::new(
                QuestionId::generate(),
                "  Padded  ",
                opts(&["yes", "no"]),
                "no",
                Some(String::new()),
            ),
            Question::new(
                QuestionId::generate(),
                "Same twice?",
                opts(&["same", "same", "other"]),
                "same",
                Some("  ".into()),
            ),
        ];

        for question in constructed {
            let question = question.unwrap();
            let reparsed = parse(&question.to_block()).into_questions().unwrap();
            assert_eq!(reparsed.len(), 1, "{}", question.to_block());
            let back = &reparsed[0];
            assert_eq!(back.text(), question.text());
            assert_eq!(back.options(), question.options());
            assert_eq!(back.correct_answer(), question.correct_answer());
            assert_eq!(back.explanation(), question.explanation());
        }
    }

    #[test]
    fn classify_recognizes_markers() {
        assert_eq!(classify("12) text"), Line::Option { key: 12, text: "text" });
        assert_eq!(classify("3)"), Line::Option { key: 3, text: "" });
        assert_eq!(classify("Answer:4"), Line::Answer(4));
        assert_eq!(classify("EXPLANATION: why"), Line::Explanation("why"));
        assert_eq!(classify("1. not an option"), Line::Other);
        assert_eq!(classify("Ànswer: 1"), Line::Other);
    }
}

use std::fmt;
use std::path::Path;

use clap::Parser;
use log::{info, warn};

use services::{
    Clock, LicenseRequest, LicenseService, ResultService, ReviewError, ReviewSession,
    SessionContext, SessionError, SessionLauncher,
};
use storage::repository::Storage;
use study_core::model::Learner;
use study_core::{ParseError, parse, render_questions};

mod cli;
mod console;
mod settings;

use cli::{Cli, Command, LicenseCommand, TakeArgs};
use settings::{FileSettings, prepare_sqlite_file, resolve_db_url};

/// Command failures worth a plain message.
#[derive(Debug)]
enum RunError {
    NoQuestions(ParseError),
    CannotStart(SessionError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NoQuestions(err) => write!(f, "{err}"),
            RunError::CannotStart(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {}

fn read_questions_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()).into())
}

async fn open_storage(db: Option<&str>) -> Result<Storage, Box<dyn std::error::Error>> {
    let db_url = resolve_db_url(db)?;
    // Open + migrate SQLite before any command touches it.
    prepare_sqlite_file(&db_url)?;
    Ok(Storage::sqlite(&db_url).await?)
}

fn check(path: &Path, render: bool) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_questions_file(path)?;
    let outcome = parse(&text);
    for diagnostic in outcome.diagnostics() {
        println!("{diagnostic}");
    }
    println!(
        "{} questions accepted, {} of {} blocks dropped",
        outcome.questions().len(),
        outcome.dropped_blocks(),
        outcome.block_count()
    );

    let questions = outcome.into_questions().map_err(RunError::NoQuestions)?;
    if render {
        println!();
        println!("{}", render_questions(&questions));
    }
    Ok(())
}

async fn take(args: TakeArgs, db: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_questions_file(&args.file)?;
    let outcome = parse(&text);
    for warning in outcome.warnings() {
        warn!("block {}: {}", warning.block, warning.message());
    }
    let questions = outcome.into_questions().map_err(RunError::NoQuestions)?;

    let file_settings = match &args.config {
        Some(path) => FileSettings::load(path)?,
        None => FileSettings::default(),
    };
    let config = file_settings
        .session_config(&args)
        .inspect_err(|err| eprintln!("{err}"))
        .ok();
    let learner = match (&args.roll_no, &args.name) {
        (Some(roll_no), Some(name)) => Learner::new(roll_no.as_str(), name.as_str())
            .inspect_err(|err| eprintln!("{err}"))
            .ok(),
        _ => None,
    };

    let ctx = SessionContext::new(learner, config);
    let launched = SessionLauncher::new(Clock::default_clock())
        .with_shuffle(args.shuffle)
        .launch(&ctx, &questions)
        .map_err(RunError::CannotStart)?;
    if let Some(notice) = launched.notice {
        println!(
            "only {} questions available; the test uses all of them",
            notice.available
        );
    }

    let storage = open_storage(db).await?;
    let results = ResultService::new(storage.summaries);
    let mut lines = console::stdin_lines();

    let Some(result) = console::take_test(launched.session, &mut lines).await? else {
        println!("test abandoned");
        return Ok(());
    };
    console::print_result(&result);

    let id = results.record_result(&result).await?;
    info!("saved result {id}");

    if args.no_review {
        return Ok(());
    }
    let review_settings = file_settings.review_settings(&args)?;
    match ReviewSession::new(result.incorrect_answers, review_settings) {
        Ok(review) => console::review(review, &mut lines).await?,
        Err(ReviewError::NothingToReview) => println!("nothing to review"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn history(
    roll_no: Option<&str>,
    limit: u32,
    db: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(db).await?;
    let rows = ResultService::new(storage.summaries)
        .history(roll_no, limit)
        .await?;
    if rows.is_empty() {
        println!("no results yet");
    }
    for row in rows {
        let s = &row.summary;
        println!(
            "#{} {} {} ({}) {}% {}/{}{}",
            row.id,
            s.completed_at().format("%Y-%m-%d %H:%M"),
            s.name(),
            s.roll_no(),
            s.score_percentage(),
            s.correct(),
            s.total(),
            if s.passed() { " passed" } else { "" }
        );
    }
    Ok(())
}

async fn license(command: LicenseCommand, db: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let storage = open_storage(db).await?;
    let service = LicenseService::new(storage.licenses);
    match command {
        LicenseCommand::Register { keys } => {
            let count = service.register_keys(keys).await?;
            println!("{count} keys registered");
        }
        LicenseCommand::Activate { key, device } => {
            let response = service
                .activate(LicenseRequest {
                    license_key: key,
                    device_id: device,
                })
                .await?;
            println!("{}", serde_json::to_string(&response)?);
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let db = cli.db.as_deref();
    match cli.command {
        Command::Check { file, render } => check(&file, render),
        Command::Take(args) => take(args, db).await,
        Command::History { roll_no, limit } => history(roll_no.as_deref(), limit, db).await,
        Command::License(command) => license(command, db).await,
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

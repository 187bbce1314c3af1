use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// timed multiple-choice quizzes from plain-text question files
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// sqlite database for results and licenses (env: STUDYBUDDY_DB_URL)
    #[clap(long, global = true)]
    pub db: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// parse a question file and report its diagnostics
    Check {
        file: PathBuf,

        /// print the accepted questions back in file format
        #[clap(long)]
        render: bool,
    },
    /// take a timed test from a question file
    Take(TakeArgs),
    /// show recent results
    History {
        #[clap(long)]
        roll_no: Option<String>,

        #[clap(short = 'n', long, default_value_t = 10)]
        limit: u32,
    },
    /// manage license activations
    #[clap(subcommand)]
    License(LicenseCommand),
}

#[derive(Args, Debug, Clone)]
pub struct TakeArgs {
    pub file: PathBuf,

    #[clap(long)]
    pub roll_no: Option<String>,

    #[clap(long)]
    pub name: Option<String>,

    /// json file with "session" and "review" settings
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// number of seconds for the whole test
    #[clap(short = 's', long)]
    pub timer_secs: Option<u32>,

    /// maximum number of questions to ask
    #[clap(short = 'q', long)]
    pub limit: Option<u32>,

    /// percentage needed to pass
    #[clap(short = 'p', long)]
    pub pass: Option<u8>,

    /// ask questions in random order
    #[clap(long)]
    pub shuffle: bool,

    /// skip the review of incorrect answers
    #[clap(long)]
    pub no_review: bool,

    /// overall review budget in seconds
    #[clap(long)]
    pub review_secs: Option<u32>,

    /// seconds each missed question stays up during review
    #[clap(long)]
    pub review_question_secs: Option<u32>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LicenseCommand {
    /// add keys to the catalog of valid licenses
    Register {
        #[clap(required = true)]
        keys: Vec<String>,
    },
    /// bind a key to a device
    Activate {
        #[clap(long)]
        key: Option<String>,

        #[clap(long)]
        device: Option<String>,
    },
}

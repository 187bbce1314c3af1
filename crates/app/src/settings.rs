use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use study_core::model::{ConfigError, ReviewSettings, SessionConfig};

use crate::cli::TakeArgs;

pub const DB_URL_ENV: &str = "STUDYBUDDY_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://studybuddy.sqlite3";

#[derive(Debug)]
pub enum SettingsError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Read { path, source } => {
                write!(f, "cannot read {}: {source}", path.display())
            }
            SettingsError::Parse { path, source } => {
                write!(f, "invalid settings in {}: {source}", path.display())
            }
            SettingsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Contents of a `--config` json file. Both sections are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub session: Option<SessionConfig>,
    pub review: Option<ReviewSettings>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File values, then flags on top. Defaults fill whatever neither sets.
    pub fn session_config(&self, args: &TakeArgs) -> Result<SessionConfig, ConfigError> {
        let base = self.session.unwrap_or_default();
        SessionConfig::new(
            args.timer_secs.unwrap_or(base.timer_secs()),
            args.limit.unwrap_or(base.question_limit()),
            args.pass.unwrap_or(base.passing_percentage()),
        )
    }

    pub fn review_settings(&self, args: &TakeArgs) -> Result<ReviewSettings, ConfigError> {
        let base = self.review.unwrap_or_default();
        ReviewSettings::new(
            args.review_secs.unwrap_or(base.overall_secs()),
            args.review_question_secs
                .unwrap_or(base.per_question_secs()),
        )
    }
}

/// `--db`, then the environment, then `studybuddy.sqlite3` in the working directory.
pub fn resolve_db_url(flag: Option<&str>) -> Result<String, SettingsError> {
    let raw = match flag {
        Some(value) => value.to_string(),
        None => std::env::var(DB_URL_ENV).unwrap_or_else(|_| DEFAULT_DB_URL.to_string()),
    };
    if raw.trim().is_empty() {
        return Err(SettingsError::InvalidDbUrl { raw });
    }
    Ok(normalize_sqlite_url(raw))
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if needed.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| SettingsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(SettingsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    use crate::cli::{Cli, Command};

    fn take_args(extra: &[&str]) -> TakeArgs {
        let mut argv = vec!["studybuddy", "take", "bank.txt"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Take(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_override_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"session": {{"timer_secs": 120, "question_limit": 4, "passing_percentage": 50}},
                "review": {{"overall_secs": 60, "per_question_secs": 30}}}}"#
        )
        .unwrap();

        let settings = FileSettings::load(file.path()).unwrap();
        let config = settings.session_config(&take_args(&["-q", "2"])).unwrap();
        assert_eq!(config.timer_secs(), 120);
        assert_eq!(config.question_limit(), 2);
        assert_eq!(config.passing_percentage(), 50);

        let review = settings.review_settings(&take_args(&[])).unwrap();
        assert_eq!(review.overall_secs(), 60);
        assert_eq!(review.per_question_secs(), 30);
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let config = FileSettings::default()
            .session_config(&take_args(&[]))
            .unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn zero_values_are_reported() {
        let err = FileSettings::default()
            .session_config(&take_args(&["-s", "0"]))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimer);
    }

    #[test]
    fn rejects_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sesion": {{}}}}"#).unwrap();
        assert!(matches!(
            FileSettings::load(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn keeps_explicit_sqlite_urls() {
        assert_eq!(
            resolve_db_url(Some("sqlite::memory:")).unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            resolve_db_url(Some("sqlite:///tmp/x.db")).unwrap(),
            "sqlite:///tmp/x.db"
        );
        assert!(resolve_db_url(Some("  ")).is_err());
    }
}

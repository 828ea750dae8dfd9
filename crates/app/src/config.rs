use std::env;
use std::fmt;
use std::path::PathBuf;

use quiz_core::model::{Difficulty, QuizId};
use services::{LeaderboardQuery, LeaderboardSort, QuizFilter, SessionMode, SortDirection};

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3?mode=rwc";
const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings read from the environment (and `.env`), then overridden by flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    /// Signed-in learner; exam results are saved under this name.
    pub user: Option<String>,
    pub rust_log: String,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            db_url: non_blank("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            user: non_blank("QUIZ_USER"),
            rust_log: non_blank("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizRef {
    Id(String),
    ShareCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List { filter: QuizFilter },
    Categories,
    Attempt { quiz: QuizRef, mode: SessionMode },
    Leaderboard {
        query: LeaderboardQuery,
        top: Option<usize>,
        json: bool,
    },
    Create { path: PathBuf },
    Help,
}

#[derive(Debug)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingArgument { what: &'static str },
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidSort { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDifficulty { raw: String },
    NotApplicable { flag: &'static str, command: String },
    Conflict { flag: &'static str, with: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing command"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSort { raw } => write!(f, "invalid --sort value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (easy, medium or hard)")
            }
            ArgsError::NotApplicable { flag, command } => {
                write!(f, "{flag} does not apply to `{command}`")
            }
            ArgsError::Conflict { flag, with } => write!(f, "{flag} cannot be combined with {with}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

/// Parse the command line, applying `--db` and `--user` to `config`.
///
/// # Errors
///
/// Returns `ArgsError` for unknown commands or flags and malformed values.
pub fn parse_args(
    args: impl IntoIterator<Item = String>,
    config: &mut Config,
) -> Result<Command, ArgsError> {
    let mut args = args.into_iter();
    let mut positional = Vec::new();
    let mut exam = false;
    let mut query = LeaderboardQuery::default();
    let mut sorted = false;
    let mut top = None;
    let mut json = false;
    let mut search = None;
    let mut filter = QuizFilter::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(&mut args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                config.db_url = value;
            }
            "--user" => config.user = Some(require_value(&mut args, "--user")?),
            "--exam" => exam = true,
            "--quiz" => query.quiz_id = Some(QuizId::new(require_value(&mut args, "--quiz")?)),
            "--search" => search = Some(require_value(&mut args, "--search")?),
            "--category" => filter.category = Some(require_value(&mut args, "--category")?),
            "--difficulty" => {
                let raw = require_value(&mut args, "--difficulty")?;
                filter.difficulty = Some(
                    raw.parse::<Difficulty>()
                        .map_err(|_| ArgsError::InvalidDifficulty { raw })?,
                );
            }
            "--sort" => {
                let raw = require_value(&mut args, "--sort")?;
                query.sort = raw
                    .parse::<LeaderboardSort>()
                    .map_err(|_| ArgsError::InvalidSort { raw })?;
                sorted = true;
            }
            "--asc" => {
                query.direction = SortDirection::Ascending;
                sorted = true;
            }
            "--top" => {
                let raw = require_value(&mut args, "--top")?;
                let n = raw.parse::<usize>().map_err(|_| ArgsError::InvalidNumber {
                    flag: "--top",
                    raw,
                })?;
                top = Some(n);
            }
            "--json" => json = true,
            "--help" | "-h" => return Ok(Command::Help),
            flag if flag.starts_with('-') => return Err(ArgsError::UnknownArg(arg)),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(name) = positional.next() else {
        return Err(ArgsError::MissingCommand);
    };
    let mut operand = |what| positional.next().ok_or(ArgsError::MissingArgument { what });

    // Quiz filters only make sense when browsing.
    if name != "list" {
        let stray = [
            ("--category", filter.category.is_some()),
            ("--difficulty", filter.difficulty.is_some()),
        ];
        if let Some((flag, _)) = stray.into_iter().find(|(_, set)| *set) {
            return Err(ArgsError::NotApplicable {
                flag,
                command: name,
            });
        }
    }

    let command = match name.as_str() {
        "list" => {
            filter.search = search;
            Command::List { filter }
        }
        "categories" => Command::Categories,
        "take" => Command::Attempt {
            quiz: QuizRef::Id(operand("quiz id")?),
            mode: SessionMode::Practice,
        },
        "exam" => Command::Attempt {
            quiz: QuizRef::Id(operand("quiz id")?),
            mode: SessionMode::Exam,
        },
        "join" => Command::Attempt {
            quiz: QuizRef::ShareCode(operand("share code")?),
            mode: if exam {
                SessionMode::Exam
            } else {
                SessionMode::Practice
            },
        },
        "leaderboard" => {
            // `--top` always ranks by score.
            if top.is_some() && sorted {
                return Err(ArgsError::Conflict {
                    flag: "--top",
                    with: "--sort or --asc",
                });
            }
            query.participant = search;
            Command::Leaderboard { query, top, json }
        }
        "create" => Command::Create {
            path: PathBuf::from(operand("quiz file")?),
        },
        "help" => Command::Help,
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = positional.next() {
        return Err(ArgsError::UnknownArg(extra));
    }
    Ok(command)
}

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::model::{Difficulty, QuestionDraft, QuizDraft, QuizId, ResultRecord};
use quiz_core::share_code::ShareCode;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    results: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3?mode=rwc".into());
        let mut results = true;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--no-results" => results = false,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            results,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3?mode=rwc)");
    eprintln!("  --no-results              Skip the sample leaderboard results");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL");
}

fn question(id: u32, prompt: &str, options: [&str; 4], correct: usize) -> QuestionDraft {
    QuestionDraft::new(
        id,
        prompt,
        options.iter().map(|o| (*o).to_owned()).collect(),
        correct,
    )
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|t| (*t).to_owned()).collect()
}

fn sample_quizzes() -> Vec<(&'static str, QuizDraft)> {
    vec![
        (
            "1",
            QuizDraft {
                title: "Web Development Basics".into(),
                description: "Test your knowledge of HTML, CSS, and JavaScript fundamentals."
                    .into(),
                author: "TechTeacher".into(),
                category: "Programming".into(),
                time_limit: 10,
                difficulty: Difficulty::Easy,
                tags: tags(&["HTML", "CSS", "JavaScript", "Web"]),
                questions: vec![
                    question(
                        1,
                        "What does HTML stand for?",
                        [
                            "Hyper Text Markup Language",
                            "High Tech Machine Learning",
                            "Hyperlink Text Manipulation Language",
                            "Home Tool Markup Language",
                        ],
                        0,
                    ),
                    question(
                        2,
                        "Which CSS property is used to change the text color?",
                        ["text-style", "font-color", "color", "text-color"],
                        2,
                    ),
                    question(
                        3,
                        "Which of the following is NOT a JavaScript data type?",
                        ["String", "Boolean", "Integer", "Object"],
                        2,
                    ),
                    question(
                        4,
                        "What is the correct way to comment in JavaScript?",
                        [
                            "// This is a comment",
                            "/* This is a comment */",
                            "<!-- This is a comment -->",
                            "Both A and B",
                        ],
                        3,
                    ),
                    question(
                        5,
                        "Which CSS property is used to add space between elements?",
                        ["spacing", "margin", "padding", "gap"],
                        1,
                    ),
                ],
            },
        ),
        (
            "2",
            QuizDraft {
                title: "Science Quiz: Physics Fundamentals".into(),
                description: "Test your knowledge of basic physics concepts and principles."
                    .into(),
                author: "ScienceGuru".into(),
                category: "Science".into(),
                time_limit: 15,
                difficulty: Difficulty::Medium,
                tags: tags(&["Physics", "Science", "Education"]),
                questions: vec![
                    question(
                        1,
                        "What is the SI unit of force?",
                        ["Watt", "Joule", "Newton", "Pascal"],
                        2,
                    ),
                    question(
                        2,
                        "Which scientist formulated the laws of motion?",
                        [
                            "Albert Einstein",
                            "Isaac Newton",
                            "Galileo Galilei",
                            "Nikola Tesla",
                        ],
                        1,
                    ),
                    question(
                        3,
                        "What is the formula for calculating work?",
                        ["W = F × d", "W = m × g", "W = m × a", "W = F × t"],
                        0,
                    ),
                ],
            },
        ),
        (
            "3",
            QuizDraft {
                title: "General Knowledge Quiz".into(),
                description: "Test your knowledge across various subjects.".into(),
                author: "QuizMaster".into(),
                category: "General".into(),
                time_limit: 20,
                difficulty: Difficulty::Medium,
                tags: tags(&["General Knowledge", "Trivia", "Fun"]),
                questions: vec![
                    question(
                        1,
                        "Which planet is known as the Red Planet?",
                        ["Venus", "Mars", "Jupiter", "Saturn"],
                        1,
                    ),
                    question(
                        2,
                        "Who wrote \"Romeo and Juliet\"?",
                        [
                            "Charles Dickens",
                            "Jane Austen",
                            "William Shakespeare",
                            "F. Scott Fitzgerald",
                        ],
                        2,
                    ),
                    question(
                        3,
                        "What is the capital of Japan?",
                        ["Beijing", "Seoul", "Tokyo", "Bangkok"],
                        2,
                    ),
                ],
            },
        ),
        (
            "4",
            QuizDraft {
                title: "Mathematical Puzzles".into(),
                description: "Challenge your brain with these math problems.".into(),
                author: "MathWhiz".into(),
                category: "Mathematics".into(),
                time_limit: 30,
                difficulty: Difficulty::Hard,
                tags: tags(&["Math", "Puzzles", "Problem Solving"]),
                questions: vec![
                    question(
                        1,
                        "What is the value of x in the equation 2x + 5 = 13?",
                        ["3", "4", "5", "6"],
                        1,
                    ),
                    question(2, "What is the derivative of x²?", ["x", "2x", "2x²", "x³"], 1),
                ],
            },
        ),
    ]
}

const SAMPLE_RESULTS: [(&str, &str, u32, u64); 8] = [
    ("1", "CodeNinja", 90, 480),
    ("1", "WebWizard", 85, 520),
    ("1", "HTMLHero", 80, 550),
    ("2", "PhysicsPhenom", 95, 720),
    ("2", "ScienceStudent", 75, 810),
    ("3", "TriviaKing", 100, 900),
    ("4", "MathMaster", 90, 1200),
    ("4", "NumberNerd", 85, 1250),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let samples = sample_quizzes();
    let quiz_count = samples.len();
    for (offset, (id, draft)) in samples.into_iter().enumerate() {
        let created_at = now - Duration::days(i64::try_from(quiz_count - offset)?);
        let quiz = draft.validate(QuizId::new(id), created_at)?;
        storage.quizzes.upsert_quiz(&quiz).await?;

        let fallback = u64::try_from(created_at.timestamp_millis())?;
        let code = ShareCode::derive(quiz.id(), fallback);
        storage.share_codes.store_share_code(&code, quiz.id()).await?;
        println!("{:<40} share code {code}", quiz.title());
    }

    let mut appended = 0_usize;
    if args.results && storage.results.list_results().await?.is_empty() {
        for (i, (quiz_id, username, score, time_taken)) in SAMPLE_RESULTS.iter().enumerate() {
            let completed_at = now - Duration::hours(i64::try_from(SAMPLE_RESULTS.len() - i)?);
            let result = ResultRecord::new(
                QuizId::new(*quiz_id),
                username,
                *score,
                *time_taken,
                completed_at,
            )?;
            storage.results.append_result(&result).await?;
            appended += 1;
        }
    }

    println!(
        "Seeded {quiz_count} quizzes and {appended} results into {}",
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

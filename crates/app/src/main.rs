mod config;
mod prompt;
mod render;

use std::io::BufRead;
use std::sync::Arc;

use quiz_core::model::{Quiz, QuizDraft, QuizId};
use services::{
    AppServices, Clock, HeadlessProctor, IdentityProvider, LeaderboardQuery, QuizFilter,
    SessionCommand, SessionDriver, SessionMode, SessionNotice, StaticIdentity,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Command, Config, QuizRef};
use prompt::Input;

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz list [--search <text>] [--category <name>] [--difficulty <level>]");
    eprintln!("  quiz categories");
    eprintln!("  quiz take <quiz-id>                 # practice");
    eprintln!("  quiz exam <quiz-id>                 # timed exam");
    eprintln!("  quiz join <share-code> [--exam]");
    eprintln!("  quiz leaderboard [--quiz <id>] [--search <name>] [--sort <key>] [--asc]");
    eprintln!("                   [--top <n>] [--json]");
    eprintln!("    sort keys: score (default), time, date, participant, quiz");
    eprintln!("  quiz create <quiz.json>");
    eprintln!();
    eprintln!("Global flags:");
    eprintln!("  --db <sqlite_url>   (default {})", config::DEFAULT_DB_URL);
    eprintln!("  --user <name>       save exam results under this name");
    eprintln!();
    eprintln!("Environment (also read from .env):");
    eprintln!("  QUIZ_DB_URL, QUIZ_USER, RUST_LOG");
}

fn init_tracing(filter: &str) {
    // Logs go to stderr so they never interleave with the quiz on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    let command = config::parse_args(std::env::args().skip(1), &mut config).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    if command == Command::Help {
        print_usage();
        return Ok(());
    }
    init_tracing(&config.rust_log);

    let identity: Arc<dyn IdentityProvider> = Arc::new(StaticIdentity::new(config.user.clone()));
    let services = AppServices::new_sqlite(&config.db_url, Clock::system(), identity).await?;

    match command {
        Command::List { filter } => list(&services, &filter).await,
        Command::Categories => {
            for category in services.catalog().categories().await? {
                println!("{category}");
            }
            Ok(())
        }
        Command::Attempt { quiz, mode } => {
            let quiz = resolve(&services, quiz).await?;
            attempt(&services, &quiz, mode).await
        }
        Command::Leaderboard { query, top, json } => {
            leaderboard(&services, &query, top, json).await
        }
        Command::Create { path } => {
            let raw = std::fs::read_to_string(&path)?;
            let draft: QuizDraft = serde_json::from_str(&raw)?;
            let published = services.catalog().create_quiz(draft).await?;
            println!(
                "Created \"{}\" ({} questions)\n  id:         {}\n  share code: {}",
                published.quiz.title(),
                published.quiz.question_count(),
                published.quiz.id(),
                published.share_code
            );
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

async fn list(
    services: &AppServices,
    filter: &QuizFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let quizzes = catalog.search(filter).await?;
    if quizzes.is_empty() {
        if *filter == QuizFilter::default() {
            println!("No quizzes yet. Seed some with `cargo run -p storage --bin seed`.");
        } else {
            println!("No quizzes match those filters.");
        }
        return Ok(());
    }
    for quiz in &quizzes {
        let code = catalog.share_code_for(quiz.id()).await?;
        let limit = match quiz.time_limit_minutes() {
            0 => "untimed".to_owned(),
            m => format!("{m} min"),
        };
        println!(
            "{:<8} {}  {:<32} {:>2} questions  {:<8} {:<6} {}",
            quiz.id().as_str().chars().take(8).collect::<String>(),
            code,
            quiz.title(),
            quiz.question_count(),
            limit,
            quiz.difficulty(),
            quiz.category()
        );
    }
    Ok(())
}

async fn resolve(
    services: &AppServices,
    quiz: QuizRef,
) -> Result<QuizId, Box<dyn std::error::Error>> {
    let found: Option<Quiz> = match &quiz {
        QuizRef::Id(id) => services.catalog().get_quiz(&QuizId::new(id.as_str())).await?,
        QuizRef::ShareCode(code) => services.catalog().find_by_share_code(code).await?,
    };
    let Some(found) = found else {
        let what = match quiz {
            QuizRef::Id(id) => format!("quiz {id}"),
            QuizRef::ShareCode(code) => format!("share code {code}"),
        };
        return Err(format!("no {what} found").into());
    };
    Ok(found.id().clone())
}

/// Run one attempt interactively until the learner leaves.
async fn attempt(
    services: &AppServices,
    quiz_id: &QuizId,
    mode: SessionMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, mut notices) =
        SessionDriver::spawn(services.attempts(), Arc::new(HeadlessProctor), quiz_id, mode)
            .await?;
    println!("Type `?` for help.");
    spawn_input(handle.sender());

    while let Some(notice) = notices.recv().await {
        if let Some(text) = render::notice(&notice) {
            println!("{text}");
        }
        if notice == SessionNotice::Closed {
            break;
        }
    }
    handle.closed().await;
    Ok(())
}

/// Forward stdin lines to the session.
///
/// Reads on a plain thread: a blocked terminal read cannot be cancelled and
/// must not hold up runtime shutdown.
fn spawn_input(commands: mpsc::Sender<SessionCommand>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(error = %err, "stdin read failed");
                    break;
                }
            };
            match prompt::parse_line(&line) {
                Input::Command(command) => {
                    if commands.blocking_send(command).is_err() {
                        return;
                    }
                }
                Input::Help => println!("{}", prompt::HELP),
                Input::Unknown(text) => println!("? unknown input {text:?}, type `?` for help"),
                Input::Empty => {}
            }
        }
        // End of input leaves the session; saved progress is kept.
        let _ = commands.blocking_send(SessionCommand::Leave);
    });
}

async fn leaderboard(
    services: &AppServices,
    query: &LeaderboardQuery,
    top: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let board = services.leaderboard();
    let entries = match top {
        Some(n) => board.top_matching(query, n).await?,
        None => board.list(query).await?,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", render::leaderboard(&entries));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}


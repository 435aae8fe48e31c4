use std::fmt;
use std::sync::Arc;

use memorizer_core::model::{Deck, ReviewGrade};
use services::{AnswerOutcome, Clock, DeckOverview, PersistentSession, ReviewView, SessionError};
use storage::repository::Storage;
use tokio::io::{AsyncBufReadExt, BufReader};

mod track_file;

use track_file::JsonFileTrackSource;

const DEFAULT_DB_URL: &str = "sqlite://memorizer.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingOperand { command: &'static str },
    UnknownArg(String),
    InvalidDeck { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingOperand { command } => write!(f, "{command} requires an argument"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDeck { raw } => {
                write!(f, "invalid deck: {raw} (expected new, again or good)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app import <tracks.json> [--db <sqlite_url>]");
    eprintln!("  app overview             [--db <sqlite_url>]");
    eprintln!("  app review [new|again|good] [--db <sqlite_url>]");
    eprintln!("  app reset                [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Review keys:");
    eprintln!("  j = again, k = good, p = play/pause, q = back to overview");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MEMORIZER_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Import { path: String },
    Overview,
    Review { deck: Option<Deck> },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    command: Command,
    db_url: String,
}

impl Args {
    fn parse(
        args: impl IntoIterator<Item = String>,
        env_db_url: Option<String>,
    ) -> Result<Option<Self>, ArgsError> {
        let mut args = args.into_iter();
        let mut db_url = env_db_url.map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut name: Option<String> = None;
        let mut operand: Option<String> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if name.is_none() => name = Some(arg),
                _ if operand.is_none() => operand = Some(arg),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match (name.as_deref(), operand) {
            (None, _) => return Ok(None),
            (Some("import"), Some(path)) => Command::Import { path },
            (Some("import"), None) => return Err(ArgsError::MissingOperand { command: "import" }),
            (Some("overview"), None) => Command::Overview,
            (Some("review"), None) => Command::Review { deck: None },
            (Some("review"), Some(raw)) => {
                let deck = raw
                    .parse::<Deck>()
                    .map_err(|_| ArgsError::InvalidDeck { raw: raw.clone() })?;
                Command::Review { deck: Some(deck) }
            }
            (Some("reset"), None) => Command::Reset,
            (Some("overview" | "reset"), Some(extra)) => return Err(ArgsError::UnknownArg(extra)),
            (Some(other), _) => return Err(ArgsError::UnknownArg(other.to_owned())),
        };

        Ok(Some(Self { command, db_url }))
    }
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
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
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

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render_overview(overview: &DeckOverview) -> String {
    let mut out = format!("{} cards loaded\n", overview.total_cards);
    for deck in Deck::ALL {
        let count = overview.counts.get(deck);
        let marker = if overview.active_deck == Some(deck) {
            '>'
        } else if overview.counts.is_selectable(deck) {
            ' '
        } else {
            '-'
        };
        out.push_str(&format!("{marker} {:<6}{count:>5}\n", deck.label()));
    }
    out
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn render_review(view: &ReviewView) -> String {
    const BAR_WIDTH: usize = 20;
    let filled = ((view.playback_percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let bar = format!(
        "{}{}",
        "#".repeat(filled.min(BAR_WIDTH)),
        " ".repeat(BAR_WIDTH - filled.min(BAR_WIDTH))
    );
    let card = &view.current;
    let mut out = format!(
        "[{}] Card {} of {}\n  {}\n  artwork: {}\n  clip starts at {:.1}s\n  [{bar}] {}\n",
        view.deck,
        view.progress.position,
        view.progress.total,
        card.id().uri(),
        card.artwork_url(),
        card.playback_start_position() as f64 / 1000.0,
        if view.is_playing { "playing" } else { "paused" },
    );
    if let Some(next) = &view.upcoming {
        out.push_str(&format!("  queued next: {}\n", next.id().uri()));
    }
    out
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn import(session: &mut PersistentSession, path: &str) -> Result<(), SessionError> {
    let source = JsonFileTrackSource::new(".");
    let loaded = session.load_tracks(&source, path).await?;
    println!("Imported {loaded} tracks.");
    Ok(())
}

fn print_overview(session: &PersistentSession) {
    if let Some(overview) = session.deck_overview() {
        print!("{}", render_overview(&overview));
    }
}

async fn review(
    session: &mut PersistentSession,
    deck: Option<Deck>,
) -> Result<(), Box<dyn std::error::Error>> {
    match deck {
        Some(deck) => session.select_deck(Some(deck)).await?,
        None if session.review_view().is_some() => {}
        None => {
            eprintln!("No review in progress; pick a deck.");
            print_overview(session);
            return Ok(());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        session.pause_if_clip_finished();
        let Some(view) = session.review_view() else {
            break;
        };
        print!("{}", render_review(&view));
        println!("(j) again  (k) good  (p) play/pause  (q) quit");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "j" => {
                report_answer(session.answer(ReviewGrade::Again).await?);
            }
            "k" => {
                report_answer(session.answer(ReviewGrade::Good).await?);
            }
            "p" | "" => {
                let playing = session.store().playback().is_playing();
                session.set_playing(!playing);
            }
            "q" => {
                session.select_deck(None).await?;
                break;
            }
            other => eprintln!("unknown key: {other}"),
        }
    }

    print_overview(session);
    Ok(())
}

fn report_answer(outcome: Option<AnswerOutcome>) {
    if outcome.is_some_and(|outcome| outcome.deck_complete) {
        println!("Deck complete! Returning to overview.");
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let env_db_url = std::env::var("MEMORIZER_DB_URL").ok();
    let parsed = match Args::parse(std::env::args().skip(1), env_db_url) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    let mut session = PersistentSession::new(Clock::default_clock(), Arc::clone(&storage.sessions));
    session.hydrate().await?;

    match parsed.command {
        Command::Import { path } => {
            import(&mut session, &path).await?;
            print_overview(&session);
        }
        Command::Overview => print_overview(&session),
        Command::Review { deck } => review(&mut session, deck).await?,
        Command::Reset => {
            session.clear().await?;
            println!("Session cleared.");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

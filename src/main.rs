use anyhow::Result;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use flashrep::app::App;
use flashrep::clock::SystemClock;
use flashrep::config::Config;
use flashrep::item::{Evaluation, Item, parse_quality};
use flashrep::queue::SessionProgress;
use flashrep::storage::SqliteStore;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// flashrep - spaced repetition for flashcard courses
#[derive(Parser)]
#[command(name = "flashrep")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SM-2 spaced repetition scheduling and review queues")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create review items for flashcards
    Add {
        user: String,
        #[arg(required = true)]
        flashcards: Vec<String>,
    },

    /// Grade an item (0-5 or bad/unsure/almost/good)
    Eval {
        user: String,
        item: String,
        grade: String,
    },

    /// Items to study now
    Session { user: String },

    /// Scheduled items grouped by learning stage, with optional done tallies
    Count {
        user: String,
        /// New items already studied this session
        #[arg(long, default_value_t = 0)]
        new_done: u32,
        /// Learning-stage items already studied this session
        #[arg(long, default_value_t = 0)]
        due_done: u32,
        /// Established items already studied this session
        #[arg(long, default_value_t = 0)]
        review_done: u32,
    },

    /// Upcoming reviews per day (UTC)
    Forecast { user: String },

    /// All items
    List { user: String },
}

fn format_ts(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn print_item(item: &Item) {
    let next = if item.is_new() {
        "new".to_string()
    } else {
        format_ts(item.next_repetition)
    };
    println!(
        "{}\t{}\tnext={}\tstreak={}\tef={:.2}{}",
        item.id,
        item.flashcard_id,
        next,
        item.actual_times_repeated,
        item.easiness_factor,
        if item.extra_repeat_today { "\textra" } else { "" }
    );
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    config.ensure_dirs()?;

    let store = SqliteStore::open(&config.db_path)?;
    let app = App::new(store, SystemClock, &config);

    match cli.command {
        Commands::Add { user, flashcards } => {
            for item in app.create_items(&user, &flashcards)? {
                print_item(&item);
            }
        }
        Commands::Eval { user, item, grade } => {
            let evaluation = Evaluation {
                item_id: item,
                evaluation: parse_quality(&grade)?,
            };
            let item = app.evaluate(&user, &evaluation)?;
            print_item(&item);
        }
        Commands::Session { user } => {
            for item in app.session(&user)? {
                print_item(&item);
            }
        }
        Commands::Count {
            user,
            new_done,
            due_done,
            review_done,
        } => {
            let done = SessionProgress {
                new_done,
                due_done,
                review_done,
            };
            let count = app.session_count(&user, done)?;
            println!("new (never scheduled)\t{}/{}", count.new_done, count.new_total);
            println!("due (learning)\t{}/{}", count.due_done, count.due_total);
            println!("review (established)\t{}/{}", count.review_done, count.review_total);
        }
        Commands::Forecast { user } => {
            for day in app.reviews(&user)? {
                let date = DateTime::from_timestamp(day.ts, 0)
                    .map(|dt| dt.date_naive().to_string())
                    .unwrap_or_else(|| day.ts.to_string());
                println!("{}\t{}\t{}", date, day.ts, day.count);
            }
        }
        Commands::List { user } => {
            for item in app.items(&user)? {
                print_item(&item);
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    run(cli)
}

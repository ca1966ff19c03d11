use std::fmt;
use std::io::{BufRead, Write};

use quiz_core::QuizSettings;
use quiz_core::model::{ImageBase, QuizSession, Score, TopicId};
use quiz_core::unlock::TopicState;
use services::{AppServices, QuizLoopService, QuizOutcome};
use storage::catalog::JsonCatalogSource;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { command: &'static str, flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidFinalSize { raw: String },
    InvalidScore { raw: String },
    InvalidTopic { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { command, flag } => write!(f, "{command} requires {flag}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidFinalSize { raw } => write!(f, "invalid --final-size value: {raw}"),
            ArgsError::InvalidScore { raw } => write!(f, "invalid --score value: {raw}"),
            ArgsError::InvalidTopic { raw } => write!(f, "invalid --topic value: {raw:?}"),
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
    eprintln!("  app status      [options]");
    eprintln!("  app record      --topic <id> --score <0-100> [options]");
    eprintln!("  app select      --topic <id> [options]");
    eprintln!("  app quiz        --topic <id> [options]");
    eprintln!("  app final-test  [options]");
    eprintln!("  app reset       [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       default sqlite://quiz.sqlite3");
    eprintln!("  --catalog <path>        default catalog.json");
    eprintln!("  --final-size <n>        default 40");
    eprintln!("  --image-base <url>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATALOG, QUIZ_FINAL_SIZE, QUIZ_IMAGE_BASE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Record,
    Select,
    Quiz,
    FinalTest,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "record" => Some(Self::Record),
            "select" => Some(Self::Select),
            "quiz" => Some(Self::Quiz),
            "final-test" => Some(Self::FinalTest),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Record => "record",
            Self::Select => "select",
            Self::Quiz => "quiz",
            Self::FinalTest => "final-test",
            Self::Reset => "reset",
        }
    }
}

struct Args {
    db_url: String,
    catalog_path: String,
    final_size: usize,
    image_base: Option<String>,
    topic: Option<TopicId>,
    score: Option<f64>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut catalog_path =
            std::env::var("QUIZ_CATALOG").unwrap_or_else(|_| "catalog.json".into());
        let mut final_size = std::env::var("QUIZ_FINAL_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(QuizSettings::DEFAULT_FINAL_TEST_SIZE);
        let mut image_base = std::env::var("QUIZ_IMAGE_BASE")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let mut topic = None;
        let mut score = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => catalog_path = require_value(args, "--catalog")?,
                "--final-size" => {
                    let value = require_value(args, "--final-size")?;
                    final_size = value
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or(ArgsError::InvalidFinalSize { raw: value })?;
                }
                "--image-base" => image_base = Some(require_value(args, "--image-base")?),
                "--topic" => {
                    let value = require_value(args, "--topic")?;
                    let parsed = value
                        .parse::<TopicId>()
                        .map_err(|_| ArgsError::InvalidTopic { raw: value })?;
                    topic = Some(parsed);
                }
                "--score" => {
                    let value = require_value(args, "--score")?;
                    let parsed: f64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidScore { raw: value.clone() })?;
                    score = Some(parsed);
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
            catalog_path,
            final_size,
            image_base,
            topic,
            score,
        })
    }

    fn require_topic(&self, cmd: Command) -> Result<TopicId, ArgsError> {
        self.topic.clone().ok_or(ArgsError::MissingFlag {
            command: cmd.name(),
            flag: "--topic",
        })
    }

    fn settings(&self) -> Result<QuizSettings, Box<dyn std::error::Error>> {
        let image_base = self.image_base.as_deref().map(ImageBase::parse).transpose()?;
        Ok(QuizSettings::new(self.final_size, image_base)?)
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

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => Command::Status,
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    debug!(command = cmd.name(), db = %parsed.db_url, catalog = %parsed.catalog_path, "starting");
    prepare_sqlite_file(&parsed.db_url)?;
    let source = JsonCatalogSource::new(&parsed.catalog_path);
    let app = AppServices::new_sqlite(&parsed.db_url, &source, parsed.settings()?).await?;

    match cmd {
        Command::Status => print_status(&app).await,
        Command::Record => {
            let topic = parsed.require_topic(cmd)?;
            let raw = parsed.score.ok_or(ArgsError::MissingFlag {
                command: cmd.name(),
                flag: "--score",
            })?;
            if app.catalog().catalog().topic(&topic).is_none() {
                return Err(ArgsError::InvalidTopic {
                    raw: topic.to_string(),
                }
                .into());
            }
            let progress = app.progress().record(&topic, Score::new(raw)?).await?;
            println!(
                "{topic}: best {} ({})",
                progress.best_score(),
                if progress.is_completed() { "completed" } else { "not passed" }
            );
            Ok(())
        }
        Command::Select => {
            let topic = parsed.require_topic(cmd)?;
            app.quiz_loop().enter_topic(&topic).await?;
            println!("{topic} selected");
            Ok(())
        }
        Command::Quiz => {
            let topic = parsed.require_topic(cmd)?;
            let quiz = app.quiz_loop();
            let session = quiz.start_topic_test(&topic).await?;
            run_interactive(&app, &quiz, session).await
        }
        Command::FinalTest => {
            let quiz = app.quiz_loop();
            let session = quiz.start_final_test().await?;
            run_interactive(&app, &quiz, session).await
        }
        Command::Reset => {
            app.progress().reset().await?;
            println!("progress cleared");
            Ok(())
        }
    }
}

async fn print_status(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let overview = app.access().overview().await?;
    if overview.lessons.is_empty() {
        println!("catalog is empty");
    }
    for lesson in &overview.lessons {
        println!(
            "{} ({}/{})",
            lesson.lesson.title, lesson.progress.completed, lesson.progress.total
        );
        for entry in &lesson.topics {
            let marker = match entry.state {
                TopicState::Completed => "[x]",
                TopicState::Active => "[>]",
                TopicState::Available => "[ ]",
                TopicState::Locked => "[-]",
            };
            println!(
                "  {marker} {} {}  best {}  {} questions",
                entry.topic.id, entry.topic.title, entry.best_score, entry.question_count
            );
        }
    }
    println!(
        "overall: {}/{} topics ({:.0}%)",
        overview.overall.completed, overview.overall.total, overview.overall.percentage
    );
    println!(
        "final test: {}  best {}",
        if overview.final_test_unlocked { "open" } else { "locked" },
        overview.best_final_test_score
    );
    Ok(())
}

/// Reads answers from stdin: a number picks an answer, `p` steps back, `q` quits.
async fn run_interactive(
    app: &AppServices,
    quiz: &QuizLoopService,
    mut session: QuizSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let access = app.access();
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let Some(question) = session.current_question().cloned() else {
            return Ok(());
        };
        let index = session.current_index().unwrap_or(0);
        println!();
        println!("[{}/{}] {}", index + 1, session.total(), question.text);
        if let Some(url) = access.image_url(&question) {
            println!("    image: {url}");
        }
        for (n, answer) in question.answers.iter().enumerate() {
            let mark = if session.selected_answer() == Some(&answer.id) { "*" } else { " " };
            println!("  {mark}{}. {}", n + 1, answer.text);
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            println!();
            return Ok(());
        };
        match line.trim() {
            "q" => return Ok(()),
            "p" => {
                quiz.previous(&mut session)?;
                continue;
            }
            choice => {
                let picked = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| question.answers.get(i));
                let Some(answer) = picked else {
                    println!("pick 1-{}, p or q", question.answers.len());
                    continue;
                };
                quiz.select_answer(&mut session, answer.id.clone())?;
            }
        }

        match quiz.next(&mut session).await? {
            QuizOutcome::Advanced { .. } => {}
            QuizOutcome::TopicFinished { score, progress } => {
                println!();
                println!(
                    "score {score}  best {}  {}",
                    progress.best_score(),
                    if score.is_passing() { "passed" } else { "not passed" }
                );
                return Ok(());
            }
            QuizOutcome::FinalTestFinished { score, best } => {
                println!();
                println!("final test score {score}  best {best}");
                return Ok(());
            }
        }
    }
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

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

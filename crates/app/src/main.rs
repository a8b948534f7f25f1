use std::fmt;
use std::path::PathBuf;

use reader_core::model::{
    ContentSource, PreferenceUpdate, QuizQuestion, SessionState, StudyContent,
};
use reader_core::text::chunk_into_paragraphs;
use services::{Clock, ReaderService, SessionProgress};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://neuroflow.sqlite3";
const SENTENCES_PER_PARAGRAPH: usize = 3;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingCommand,
    UnknownCommand(String),
    UnknownArg(String),
    MissingOperand { command: &'static str, name: &'static str },
    InvalidNumber { name: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingCommand => write!(f, "missing subcommand"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::MissingOperand { command, name } => {
                write!(f, "{command} requires <{name}>")
            }
            ArgsError::InvalidNumber { name, raw } => write!(f, "invalid <{name}> value: {raw}"),
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
    eprintln!("  neuroflow [--db <sqlite_url>] [--verbose] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status                               show the current section and progress");
    eprintln!("  seed --content <file> [--raw-input <text>]");
    eprintln!("  nav <index> | next | prev");
    eprintln!("  answer <section> <question> <option>");
    eprintln!("  submit <section>");
    eprintln!("  final-answer <question> <option>");
    eprintln!("  final-submit | mistakes | save-result");
    eprintln!("  pref <field> <value>                 mode, font-size, letter-spacing, high-contrast, large-text");
    eprintln!("  restart | reset");
    eprintln!("  results | clear-results");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  NEUROFLOW_DB_URL, NEUROFLOW_VERBOSE, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Seed {
        content: PathBuf,
        raw_input: Option<String>,
    },
    Nav(i64),
    Next,
    Prev,
    Answer {
        section: usize,
        question: usize,
        option: usize,
    },
    Submit(usize),
    FinalAnswer {
        question: usize,
        option: usize,
    },
    FinalSubmit,
    Mistakes,
    Pref {
        field: String,
        value: String,
    },
    Restart,
    Reset,
    SaveResult,
    Results,
    ClearResults,
}

struct Operands {
    command: &'static str,
    values: std::vec::IntoIter<String>,
}

impl Operands {
    fn next(&mut self, name: &'static str) -> Result<String, ArgsError> {
        self.values.next().ok_or(ArgsError::MissingOperand {
            command: self.command,
            name,
        })
    }

    fn number<T: std::str::FromStr>(&mut self, name: &'static str) -> Result<T, ArgsError> {
        let raw = self.next(name)?;
        raw.parse()
            .map_err(|_| ArgsError::InvalidNumber { name, raw })
    }

    fn finish(mut self) -> Result<(), ArgsError> {
        match self.values.next() {
            Some(extra) => Err(ArgsError::UnknownArg(extra)),
            None => Ok(()),
        }
    }
}

impl Command {
    fn name(raw: &str) -> Option<&'static str> {
        const NAMES: [&str; 17] = [
            "status",
            "seed",
            "nav",
            "next",
            "prev",
            "answer",
            "submit",
            "final-answer",
            "final-submit",
            "mistakes",
            "pref",
            "restart",
            "reset",
            "save-result",
            "results",
            "clear-results",
            "help",
        ];
        NAMES.iter().copied().find(|name| *name == raw)
    }

    fn parse(
        name: &'static str,
        positionals: Vec<String>,
        content: Option<PathBuf>,
        raw_input: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut ops = Operands {
            command: name,
            values: positionals.into_iter(),
        };
        if name != "seed" {
            if content.is_some() {
                return Err(ArgsError::UnknownArg("--content".into()));
            }
            if raw_input.is_some() {
                return Err(ArgsError::UnknownArg("--raw-input".into()));
            }
        }

        let command = match name {
            "status" => Self::Status,
            "seed" => Self::Seed {
                content: content.ok_or(ArgsError::MissingValue { flag: "--content" })?,
                raw_input,
            },
            "nav" => Self::Nav(ops.number("index")?),
            "next" => Self::Next,
            "prev" => Self::Prev,
            "answer" => Self::Answer {
                section: ops.number("section")?,
                question: ops.number("question")?,
                option: ops.number("option")?,
            },
            "submit" => Self::Submit(ops.number("section")?),
            "final-answer" => Self::FinalAnswer {
                question: ops.number("question")?,
                option: ops.number("option")?,
            },
            "final-submit" => Self::FinalSubmit,
            "mistakes" => Self::Mistakes,
            "pref" => Self::Pref {
                field: ops.next("field")?,
                value: ops.next("value")?,
            },
            "restart" => Self::Restart,
            "reset" => Self::Reset,
            "save-result" => Self::SaveResult,
            "results" => Self::Results,
            "clear-results" => Self::ClearResults,
            other => return Err(ArgsError::UnknownCommand(other.to_owned())),
        };
        ops.finish()?;
        Ok(command)
    }
}

struct Args {
    db_url: String,
    verbose: bool,
    command: Command,
}

impl Args {
    /// Returns `Ok(None)` when usage was requested.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var("NEUROFLOW_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut verbose = std::env::var("NEUROFLOW_VERBOSE")
            .ok()
            .is_some_and(|value| matches!(value.trim(), "1" | "true" | "yes" | "on"));
        let mut name: Option<&'static str> = None;
        let mut positionals = Vec::new();
        let mut content = None;
        let mut raw_input = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--verbose" | "-v" => verbose = true,
                "--content" => content = Some(PathBuf::from(require_value(&mut args, "--content")?)),
                "--raw-input" => raw_input = Some(require_value(&mut args, "--raw-input")?),
                "--help" | "-h" => return Ok(None),
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ if name.is_none() => {
                    name = Some(Command::name(&arg).ok_or(ArgsError::UnknownCommand(arg))?);
                }
                _ => positionals.push(arg),
            }
        }

        let name = name.ok_or(ArgsError::MissingCommand)?;
        if name == "help" {
            return Ok(None);
        }
        let command = Command::parse(name, positionals, content, raw_input)?;
        Ok(Some(Self {
            db_url,
            verbose,
            command,
        }))
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
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

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_content(path: &std::path::Path) -> Result<StudyContent, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let content = StudyContent::from_json_str(&raw).map_err(reader_core::Error::from)?;
    Ok(content)
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn option_label(option: Option<usize>) -> String {
    option.map_or_else(|| "-".to_owned(), |idx| idx.to_string())
}

fn print_status(state: &SessionState) {
    let prefs = state.preferences();
    println!(
        "mode: {}  font: {}  spacing: {}  contrast: {}  large-text: {}",
        prefs.mode,
        prefs.font_size.as_str(),
        prefs.letter_spacing.as_str(),
        if prefs.high_contrast { "high" } else { "normal" },
        if prefs.dyslexia_large_text { "on" } else { "off" },
    );

    let Some(content) = state.content() else {
        println!("no content loaded; run `neuroflow seed --content <file>`");
        return;
    };
    let progress = SessionProgress::from_state(state);
    println!();
    println!("{}", content.overall_title);
    println!(
        "section {}/{}  completed {}/{}",
        progress.current_section + 1,
        progress.total_sections,
        progress.completed_sections,
        progress.total_sections,
    );

    let index = state.current_section_index();
    if let Some(section) = state.current_section() {
        println!();
        println!("## {}", section.title);
        for paragraph in chunk_into_paragraphs(&section.content, SENTENCES_PER_PARAGRAPH) {
            println!();
            println!("{paragraph}");
        }
        if !section.key_points().is_empty() {
            println!();
            println!("Key points:");
            for point in section.key_points() {
                println!("  * {point}");
            }
        }

        let answers = state.section_answers(index).unwrap_or_default();
        println!();
        match state.section_test(index).filter(|test| test.submitted()) {
            Some(test) => println!(
                "Mini-test: {}/{} correct",
                test.score(),
                section.question_count()
            ),
            None => println!("Mini-test:"),
        }
        print_questions(&section.mini_test, &answers);
    }

    if progress.is_last_section || progress.all_sections_complete {
        let answers = state.final_answers().unwrap_or_default();
        println!();
        match progress.final_score {
            Some(score) => println!(
                "Final test: {score}/{} correct{}",
                progress.final_total,
                if progress.final_result_saved { " (saved)" } else { "" }
            ),
            None => println!("Final test:"),
        }
        print_questions(&content.final_test, &answers);
    }
}

fn print_questions(questions: &[QuizQuestion], answers: &[Option<usize>]) {
    for (q_idx, question) in questions.iter().enumerate() {
        let selected = answers.get(q_idx).copied().flatten();
        println!("  {q_idx}. {}  [answer: {}]", question.question, option_label(selected));
        for (o_idx, option) in question.options.iter().enumerate() {
            let marker = if selected == Some(o_idx) { '>' } else { ' ' };
            println!("     {marker} {o_idx}) {option}");
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return Err(err.into());
        }
    };

    init_tracing(parsed.verbose);
    debug!(db = %parsed.db_url, command = ?parsed.command, "starting");

    prepare_sqlite_file(&parsed.db_url)?;
    let service = ReaderService::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match parsed.command {
        Command::Status => print_status(&service.rehydrate().await?),
        Command::Seed { content, raw_input } => {
            let document = load_content(&content)?;
            let raw_input = raw_input.unwrap_or_default();
            let source = ContentSource::for_raw_input(&raw_input);
            let state = service.seed(document, source, raw_input).await?;
            print_status(&state);
        }
        Command::Nav(target) => print_status(&service.navigate(target).await?),
        Command::Next => print_status(&service.next_section().await?),
        Command::Prev => print_status(&service.previous_section().await?),
        Command::Answer {
            section,
            question,
            option,
        } => print_status(&service.set_section_answer(section, question, option).await?),
        Command::Submit(section) => print_status(&service.submit_section_test(section).await?),
        Command::FinalAnswer { question, option } => {
            print_status(&service.set_final_answer(question, option).await?);
        }
        Command::FinalSubmit => print_status(&service.submit_final_test().await?),
        Command::Mistakes => {
            let mistakes = service.final_mistakes().await?;
            if mistakes.is_empty() {
                println!("no mistakes to review");
            }
            for row in mistakes {
                println!("{}", row.question.question);
                println!("  your answer: {}", row.selected.as_deref().unwrap_or("(none)"));
                println!("  correct:     {}", row.question.correct_answer);
                println!("  fact:        {}", row.question.fact);
            }
        }
        Command::Pref { field, value } => {
            let update =
                PreferenceUpdate::parse(&field, &value).map_err(reader_core::Error::from)?;
            print_status(&service.update_preference(update).await?);
        }
        Command::Restart => print_status(&service.restart().await?),
        Command::Reset => {
            service.reset().await?;
            println!("session cleared");
        }
        Command::SaveResult => {
            let attempt = service.save_final_result().await?;
            println!(
                "saved {}: {}/{} ({})",
                attempt.id(),
                attempt.score(),
                attempt.total(),
                attempt.mode()
            );
        }
        Command::Results => {
            let results = service.list_results().await?;
            if results.is_empty() {
                println!("no saved results");
            }
            for attempt in results {
                println!(
                    "{}  {:>3}/{:<3}  {:<8}  {}",
                    attempt.timestamp().format("%Y-%m-%d %H:%M"),
                    attempt.score(),
                    attempt.total(),
                    attempt.mode().to_string(),
                    attempt.title()
                );
            }
        }
        Command::ClearResults => {
            service.clear_results().await?;
            println!("results cleared");
        }
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

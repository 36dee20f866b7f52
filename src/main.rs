//! Command-line entry point for the Completion Gateway

use clap::{Parser, ValueEnum};
use completion_gateway::{config::Settings, Gateway, ThreadMessage};
use std::io::Read;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Task {
    Summarize,
    Quiz,
    Suggest,
    Moderate,
    Translate,
    FixGrammar,
    Autocorrect,
    Thread,
    Stats,
}

#[derive(Parser, Debug)]
#[command(name = "completion-gateway")]
#[command(about = "Run a generation task through the completion gateway")]
struct Args {
    /// Task to run
    #[arg(value_enum)]
    task: Task,

    /// Input text (read from stdin when omitted)
    #[arg(short, long)]
    text: Option<String>,

    /// Target language for `translate`
    #[arg(short, long, default_value = "English")]
    language: String,

    /// Configuration file
    #[arg(short, long, default_value = "config/default.toml", env = "COMPLETION_GATEWAY_CONFIG")]
    config: PathBuf,
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().pretty().with_writer(std::io::stderr)).init();
    }
}

fn read_input(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Parse `sender: content` lines into thread messages
fn parse_thread(input: &str) -> Vec<ThreadMessage> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match line.split_once(':') {
            Some((sender, content)) => ThreadMessage {
                sender: sender.trim().to_string(),
                content: content.trim().to_string(),
            },
            None => ThreadMessage {
                sender: "unknown".to_string(),
                content: line.trim().to_string(),
            },
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = Settings::load_from_path(&args.config)?;
    init_logging(&settings);

    info!(task = ?args.task, "Starting completion gateway");
    let gateway = Gateway::from_settings(&settings)?;

    let input = match args.task {
        Task::Stats => String::new(),
        _ => read_input(args.text)?,
    };

    let output = match args.task {
        Task::Summarize => serde_json::to_value(gateway.summarize(&input).await)?,
        Task::Quiz => serde_json::to_value(gateway.generate_quiz(&input).await)?,
        Task::Suggest => serde_json::to_value(gateway.suggest_replies(&input).await)?,
        Task::Moderate => serde_json::to_value(gateway.moderate(&input).await)?,
        Task::Translate => serde_json::to_value(gateway.translate(&input, &args.language).await)?,
        Task::FixGrammar => serde_json::to_value(gateway.fix_grammar(&input).await)?,
        Task::Autocorrect => serde_json::to_value(gateway.autocorrect(&input).await)?,
        Task::Thread => {
            let messages = parse_thread(&input);
            serde_json::to_value(gateway.summarize_thread(&messages).await)?
        }
        Task::Stats => serde_json::to_value(gateway.stats())?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

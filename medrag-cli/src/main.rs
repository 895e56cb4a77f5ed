//! MedRAG CLI: answer medical literature questions from the terminal.
//!
//! Runs the full pipeline against a JSON literature corpus, or exposes the
//! risk screener and corpus statistics on their own.

mod commands;
mod render;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// MedRAG: citation-grounded answers from biomedical literature
#[derive(Parser, Debug)]
#[command(name = "medrag", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (reads `.medrag/config.toml` from here)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Generation model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Answer one or more questions against a literature corpus
    Ask {
        /// Questions, answered in order
        #[arg(required = true)]
        questions: Vec<String>,

        /// JSON file holding an array of literature records
        #[arg(short, long)]
        corpus: PathBuf,

        /// Skip the generation service and answer extractively
        #[arg(long)]
        offline: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the risk assessment for a query without answering it
    Screen {
        /// The query to assess
        query: String,
    },
    /// Show statistics for a literature corpus
    CorpusStats {
        /// JSON file holding an array of literature records
        #[arg(short, long)]
        corpus: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging, risk events included
    let log_dir = directories::ProjectDirs::from("org", "medrag", "medrag")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "medrag.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut overrides = medrag_core::config::ConfigOverrides::default();
    overrides.llm.model = cli.model.clone();
    let config = medrag_core::config::load_config(Some(&workspace), Some(&overrides))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    commands::handle_command(cli.command, config).await
}

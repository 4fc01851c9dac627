//! ideaboard CLI
//!
//! Rates product ideas with several LLM providers and writes detailed
//! and summary rating tables.

mod sink;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use ideaboard_core::{load_ideas, Aggregator, IdeaRecord, ResponseParser};
use ideaboard_runtime::{
    CredentialStore, EvaluationOrchestrator, EvaluatorConfig, ExecutionMode, ProviderRegistry,
    KNOWN_KEY_VARS,
};

use crate::sink::{write_matrix_json, CsvSink};

#[derive(Parser)]
#[command(name = "ideaboard")]
#[command(about = "Rate product ideas with several LLM providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every idea with every configured provider
    Evaluate(EvaluateArgs),

    /// List the ideas extracted from a text file
    Ideas {
        /// Plain-text file containing "Idea ID:" markers
        #[arg(long)]
        ideas: PathBuf,

        /// Comma-separated idea ids that must be present
        #[arg(long, value_delimiter = ',')]
        expect: Vec<String>,
    },

    /// Parse a saved provider response and print the record as JSON
    Parse {
        /// File holding the raw response text
        file: PathBuf,
    },
}

#[derive(Args)]
struct EvaluateArgs {
    /// Plain-text file containing "Idea ID:" markers
    #[arg(long)]
    ideas: PathBuf,

    /// YAML run configuration (defaults to providers with available keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for detailed_ratings.csv and summary_ratings.csv
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write the full evaluation matrix as JSON
    #[arg(long)]
    matrix_json: Option<PathBuf>,

    /// Call the providers of each idea concurrently
    #[arg(long)]
    parallel: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Evaluate(args) => evaluate(args).await,
        Commands::Ideas { ideas, expect } => list_ideas(&ideas, &expect),
        Commands::Parse { file } => parse_saved(&file),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }
}

async fn evaluate(args: EvaluateArgs) -> Result<()> {
    load_dotenv();

    let ideas = load_ideas(&args.ideas)
        .with_context(|| format!("Failed to load ideas from {}", args.ideas.display()))?;
    info!(count = ideas.len(), "Loaded ideas");

    let config = match &args.config {
        Some(path) => EvaluatorConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EvaluatorConfig::defaults(&CredentialStore::capture(KNOWN_KEY_VARS)),
    };

    let mode = if args.parallel {
        ExecutionMode::Parallel
    } else {
        config.mode
    };

    let store = CredentialStore::capture(config.credential_vars());
    let providers = config
        .build_providers(&ProviderRegistry::with_defaults(), &store)
        .context("Failed to set up providers")?;
    info!(providers = ?providers.names(), mode = ?mode, "Providers configured");

    let orchestrator = EvaluationOrchestrator::builder()
        .providers(providers)
        .mode(mode)
        .build()?;

    let outcome = orchestrator
        .evaluate_all_until(&ideas, shutdown_signal())
        .await;
    orchestrator.stats().log_summary();

    let evaluated: Vec<IdeaRecord> = ideas
        .iter()
        .filter(|idea| outcome.matrix.get(&idea.id).is_some())
        .cloned()
        .collect();
    let (detail, summary) = Aggregator::new().aggregate(&outcome.matrix, &evaluated);

    CsvSink::new(&args.out_dir)
        .write(&detail, &summary)
        .context("Failed to write rating tables")?;

    if let Some(path) = &args.matrix_json {
        write_matrix_json(&outcome.matrix, path)
            .with_context(|| format!("Failed to write matrix to {}", path.display()))?;
    }

    if outcome.cancelled {
        warn!(
            evaluated = evaluated.len(),
            total = ideas.len(),
            "Run interrupted, tables cover evaluated ideas and finished provider calls only"
        );
    } else {
        info!(ideas = evaluated.len(), "Evaluation complete");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn list_ideas(path: &Path, expect: &[String]) -> Result<()> {
    let ideas = load_ideas(path)
        .with_context(|| format!("Failed to load ideas from {}", path.display()))?;

    for idea in &ideas {
        println!("{}\t{}", idea.id, idea.title);
    }
    info!(count = ideas.len(), "Ideas extracted");

    let missing: Vec<&str> = expect
        .iter()
        .map(String::as_str)
        .filter(|id| !ideas.iter().any(|idea| idea.id == *id))
        .collect();

    if !missing.is_empty() {
        warn!(missing = ?missing, "Expected ideas not found");
    } else if !expect.is_empty() {
        info!("All expected ideas found");
    }

    Ok(())
}

fn parse_saved(path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let record = ResponseParser::new().parse(&raw);
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

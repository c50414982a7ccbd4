//! `askdocs`: command-line interface to the self-improving retrieval
//! engine.

mod commands;
mod config;
mod engine_setup;
mod errors;
mod output;
mod providers;

use anyhow::{Context, Result};
use askdocs_core::AskdocsEngine;
use clap::{Parser, Subcommand};
use config::CliConfig;
use engine_setup::StoreBackend;
use errors::{helpers, EnhancedError};
use output::{print_error, print_output, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "askdocs", about = "Self-improving retrieval-augmented answering engine", version)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (`libsql://...`, `file:...`, or `:memory:`). Overrides
    /// the config file. Omit entirely to use the non-persistent in-memory
    /// store.
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Auth token for a remote `libsql://` database.
    #[arg(long, global = true, default_value = "")]
    database_token: String,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question against the retrieval engine.
    Ask {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        /// Include the full reasoning trace in the output.
        #[arg(long)]
        trace: bool,
    },
    /// Inspect a past session: its answer, retrieved chunks, and scores.
    InspectSession { session_id: i64 },
    /// Record feedback for one session.
    Feedback {
        session_id: i64,
        #[arg(long)]
        correct: bool,
        /// `chunk_id:useful` pairs, e.g. `42:true`.
        #[arg(long = "chunk", value_parser = parse_chunk_feedback)]
        chunks: Vec<(i64, bool)>,
        #[arg(long)]
        correction: Option<String>,
    },
    /// Record feedback for multiple sessions from a JSON file.
    ///
    /// Expects an array of objects: `session_id`, `is_correct`,
    /// `chunk_feedback` (array of `{chunk_id, was_useful}`), `correction`.
    FeedbackBulk { file: PathBuf },
    /// Manually set a chunk's accuracy weight.
    ChunkEdit {
        chunk_id: i64,
        new_weight: f64,
        #[arg(long, default_value = "manual edit")]
        reason: String,
    },
    /// Find past successful reasoning episodes similar to a query.
    WorkflowSearch {
        query: String,
        #[arg(long, default_value_t = 0.75)]
        min_similarity: f64,
        #[arg(long, default_value_t = 3)]
        top_k: usize,
    },
    /// Summary statistics: accuracy rate, pending feedback, top chunks.
    Stats,
}

fn parse_chunk_feedback(s: &str) -> Result<(i64, bool), String> {
    let (id, useful) = s.split_once(':').ok_or_else(|| format!("expected chunk_id:useful, got '{s}'"))?;
    let id: i64 = id.parse().map_err(|_| format!("invalid chunk id '{id}'"))?;
    let useful: bool = useful.parse().map_err(|_| format!("invalid useful flag '{useful}'"))?;
    Ok((id, useful))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "askdocs_cli=debug,askdocs_core=debug" } else { "info" };
    askdocs_core::tracing::init_tracing(Some(filter));

    let (cli_config, engine_config) =
        CliConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    let database_url = cli.database_url.or(cli_config.database_url);
    let backend = match database_url {
        #[cfg(feature = "sql")]
        Some(database_url) => StoreBackend::Sql {
            database_url,
            auth_token: if cli.database_token.is_empty() { cli_config.database_token } else { cli.database_token },
        },
        #[cfg(not(feature = "sql"))]
        Some(_) => {
            print_error("this build was compiled without the `sql` feature; rebuild with --features sql");
            std::process::exit(1);
        }
        None => StoreBackend::InMemory,
    };

    let engine = engine_setup::build_engine(&engine_config, backend)
        .await
        .context_with_help("failed to build the engine", helpers::STORE_CONNECTION_HELP)?;

    if let Err(e) = run(&engine, &engine_config, cli.command, cli.format).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(
    engine: &AskdocsEngine,
    engine_config: &askdocs_core::EngineConfig,
    command: Commands,
    format: OutputFormat,
) -> Result<()> {
    match command {
        Commands::Ask { query, k, trace } => {
            let k = k.unwrap_or(5);
            let result = commands::ask(engine, &query, k, trace).await?;
            print_output(&result, format)
        }
        Commands::InspectSession { session_id } => {
            let result = commands::inspect_session(engine, session_id)
                .await
                .context_with_help("session not found", helpers::SESSION_NOT_FOUND_HELP)?;
            print_output(&result, format)
        }
        Commands::Feedback { session_id, correct, chunks, correction } => {
            let result = commands::feedback(engine, session_id, correct, &chunks, correction).await?;
            print_output(&result, format)
        }
        Commands::FeedbackBulk { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading bulk feedback file {}", file.display()))?;
            let items: Vec<BulkFeedbackInput> =
                serde_json::from_str(&text).context("parsing bulk feedback file")?;
            let requests = items
                .into_iter()
                .map(|i| (i.session_id, i.is_correct, i.chunk_feedback.into_iter().map(|c| (c.chunk_id, c.was_useful)).collect(), i.correction))
                .collect();
            let result = commands::feedback_bulk(engine, requests).await;
            print_output(&result, format)
        }
        Commands::ChunkEdit { chunk_id, new_weight, reason } => {
            let result = commands::chunk_edit(engine, chunk_id, new_weight, &reason)
                .await
                .context_with_help("chunk edit failed", helpers::CHUNK_NOT_FOUND_HELP)?;
            print_output(&result, format)
        }
        Commands::WorkflowSearch { query, min_similarity, top_k } => {
            let embedding = askdocs_core::embedder::Embedder::new(std::sync::Arc::new(
                providers::HashingEmbeddingProvider::new(engine_config.embed_dim),
            ))
            .embed(&query)
            .await?;
            let result = commands::workflow_search(engine, &embedding, min_similarity, top_k).await?;
            print_output(&result, format)
        }
        Commands::Stats => {
            let result = commands::stats(engine).await?;
            print_output(&result, format)
        }
    }
}

#[derive(serde::Deserialize)]
struct BulkFeedbackInput {
    session_id: i64,
    is_correct: bool,
    #[serde(default)]
    chunk_feedback: Vec<BulkChunkFeedbackInput>,
    #[serde(default)]
    correction: Option<String>,
}

#[derive(serde::Deserialize)]
struct BulkChunkFeedbackInput {
    chunk_id: i64,
    was_useful: bool,
}

//! Hermes server entry point
//!
//! Runs either as a one-shot CLI (index/search/fetch/fact/facts/stats) or,
//! with `--stdio`, as an MCP JSON-RPC 2.0 server speaking the tool protocol
//! on stdin/stdout. Initialization failures are fatal and set a non-zero
//! exit code; per-file ingestion errors never do.

mod cli;
mod mcp;
mod reindex;

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use hermes_graph::Hermes;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "hermes",
    about = "Pointer-based code retrieval for AI coding assistants",
    arg_required_else_help = true,
    after_help = "Environment variables:
  HERMES_PROJECT_ROOT              Root directory to index (default: cwd)
  HERMES_DB_PATH                   Database path (default: <root>/.hermes.db)
  HERMES_AUTO_INDEX_INTERVAL_SECS  Background re-index interval for --stdio
                                   (default: 300; 0 disables)
  HERMES_EMBEDDING_URL             Optional embedding provider endpoint
  HERMES_EMBEDDING_MODEL           Provider model name
  HERMES_EMBEDDING_API_KEY         Provider bearer key"
)]
struct Cli {
    /// Run as an MCP JSON-RPC 2.0 stdio server
    #[arg(long)]
    stdio: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Re-index the project into the knowledge graph
    Index,

    /// Search the graph; prints pointers, not full content
    Search {
        /// The search query
        query: String,
    },

    /// Fetch full content for a pointer id
    Fetch {
        /// Node id from a previous search
        node_id: String,
    },

    /// Record a temporal fact
    Fact {
        /// architecture, api_contract, decision, error_pattern, constraint, learning
        fact_type: String,
        /// The fact content
        content: String,
    },

    /// List active facts, optionally filtered by type
    Facts {
        /// Fact type filter
        filter: Option<String>,
    },

    /// Show token savings statistics
    Stats {
        /// Time window: e.g. 24h, 7d, all
        #[arg(long)]
        since: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hermes=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let (engine, project_root) = bootstrap()?;

    if cli.stdio {
        reindex::spawn(engine.clone(), project_root.clone());
        return mcp::serve(engine, project_root);
    }

    match cli.command {
        Some(command) => cli::run(&engine, &project_root, command),
        None => bail!("nothing to do; pass a subcommand or --stdio"),
    }
}

fn bootstrap() -> Result<(Hermes, PathBuf)> {
    let project_root = match env::var("HERMES_PROJECT_ROOT") {
        Ok(root) => PathBuf::from(root),
        Err(_) => env::current_dir()?,
    };
    let db_path = match env::var("HERMES_DB_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => project_root.join(".hermes.db"),
    };
    let project_id = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workspace")
        .to_string();

    tracing::info!("opening {} for project {project_id}", db_path.display());
    let engine = Hermes::open(&db_path, &project_id)?;
    Ok((engine, project_root))
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use casebook::cli::{commands, CollectionKind};
use casebook::Config;

#[derive(Parser)]
#[command(name = "casebook")]
#[command(
  about = "Casebook - Similar-Case Retrieval\nFind past support conversations and admin corrections that match a new issue"
)]
#[command(version)]
struct Cli {
  /// Config file (defaults to <root>/config.yaml when present)
  #[arg(long, global = true, env = "CASEBOOK_CONFIG")]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum IngestTarget {
  /// Ingest a conversation transcript JSON file
  Conversations { path: PathBuf },
  /// Ingest an admin corrections CSV file
  Corrections { path: PathBuf },
  /// Ingest every source named in the config
  All,
}

#[derive(Subcommand)]
enum Command {
  /// Load case records into their collection
  Ingest {
    #[command(subcommand)]
    target: IngestTarget,
  },
  /// Find cases similar to a query
  Search {
    /// Collection to search
    #[arg(value_enum)]
    collection: CollectionKind,
    /// Query text (space-separated)
    #[arg(required = true)]
    query: Vec<String>,
    /// Maximum number of results
    #[arg(short)]
    k: Option<usize>,
    /// Minimum similarity score in [0, 1]
    #[arg(long)]
    min_score: Option<f32>,
    /// Show similarity scores
    #[arg(long)]
    scores: bool,
  },
  /// Show entry counts per collection
  Count,
  /// Print the grounding context for a shipment
  Context {
    /// Shipment identifier
    shipment_id: String,
    /// The user's issue description
    #[arg(long)]
    issue: String,
  },
}

async fn handle(command: Command, config: &Config) -> Result<()> {
  match command {
    Command::Ingest { target } => match target {
      IngestTarget::Conversations { path } => {
        commands::ingest(config, CollectionKind::Conversations, &path).await
      }
      IngestTarget::Corrections { path } => {
        commands::ingest(config, CollectionKind::Corrections, &path).await
      }
      IngestTarget::All => commands::ingest_all(config).await,
    },
    Command::Search { collection, query, k, min_score, scores } => {
      commands::search(config, collection, &query, k, min_score, scores).await
    }
    Command::Count => commands::count(config).await,
    Command::Context { shipment_id, issue } => {
      commands::context(config, &shipment_id, &issue).await
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  // RUST_LOG wins; otherwise keep the Lance stack quiet
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if cli.verbose {
      EnvFilter::new("info,lance=warn,lance_datafusion=warn,datafusion=warn")
    } else {
      EnvFilter::new("casebook=info,lance=error,lance_datafusion=error,datafusion=error,warn")
    }
  });

  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  let config = Config::load(cli.config.as_deref())?;
  handle(cli.command, &config).await
}

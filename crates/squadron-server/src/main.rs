//! squadron binary.
//!
//! `squadron serve` opens the SQLite store and serves the JSON API.
//! `squadron populate` fetches the character dataset and reconciles it into
//! the store, enriching records with the configured AI provider.
//!
//! ```
//! cargo run -p squadron-server -- populate --skip-ai --limit 20
//! cargo run -p squadron-server -- serve
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use squadron_api::AppState;
use squadron_enrich::AiServices;
use squadron_server::{ServerConfig, expand_tilde};
use squadron_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Squadron character catalog and team roster API")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "squadron.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,
  /// Fetch the external dataset and reconcile it into the store.
  Populate {
    /// Store records without biography, evilness or embedding enrichment.
    #[arg(long)]
    skip_ai:     bool,
    /// Only ingest the first N records.
    #[arg(long, value_name = "N")]
    limit:       Option<usize>,
    /// Records processed concurrently [default: ingest.max_workers, 8].
    #[arg(long, value_name = "N")]
    max_workers: Option<usize>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  match cli.command {
    Command::Serve => serve(store, &cfg).await,
    Command::Populate { skip_ai, limit, max_workers } => {
      let mut options = cfg.ingest_options();
      options.skip_ai = skip_ai;
      options.limit = limit;
      if let Some(max_workers) = max_workers {
        options.max_workers = max_workers;
      }

      let report = squadron_ingest::run(store, &cfg.source(), &cfg.ai, &options)
        .await
        .context("ingestion failed")?;

      for failure in &report.failures {
        tracing::warn!(character = %failure.name, error = %failure.error, "skipped");
      }
      println!(
        "Processed {} of {} characters ({} created, {} updated, {} failed).",
        report.processed(),
        report.total,
        report.created,
        report.updated,
        report.failures.len(),
      );
      Ok(())
    }
  }
}

async fn serve(store: Arc<SqliteStore>, cfg: &ServerConfig) -> anyhow::Result<()> {
  let embedder = match AiServices::from_config(&cfg.ai) {
    Ok(Some(services)) => Some(services.embedder),
    Ok(None) => {
      tracing::warn!("no AI API key configured; semantic search is disabled");
      None
    }
    Err(e) => {
      tracing::warn!(error = %e, "could not initialise AI services; semantic search is disabled");
      None
    }
  };

  let app = squadron_server::app(AppState::new(store, embedder));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

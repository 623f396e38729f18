//! statesearch server binary.
//!
//! Reads `statesearch.toml` (or the path given with `--config`), opens the
//! SQLite store and, depending on the subcommand, serves the search API,
//! ingests theorems, builds vector collections or exports feedback.
//!
//! ```text
//! statesearch serve
//! statesearch ingest --data-path theorems.jsonl --rev v4.9.0 --replace
//! statesearch index --rev v4.9.0
//! statesearch export-feedback --save-path feedback.jsonl
//! ```

use std::{
  fs::File,
  io::{BufReader, BufWriter},
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use statesearch_api::{AppState, api_router};
use statesearch_core::{Revision, embed::Embedder, store::FeedbackStore, vector::VectorStore};
use statesearch_embed::{HashedEmbedder, HttpEmbedder};
use statesearch_engine::Engine;
use statesearch_server::{EmbeddingConfig, ServerConfig, VectorConfig, export, ingest};
use statesearch_store_sqlite::SqliteStore;
use statesearch_vector::{MemoryVectorStore, QdrantStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Proof-state theorem search server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "statesearch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,

  /// Load theorems from a JSON Lines file into the relational store.
  Ingest {
    #[arg(long)]
    data_path: PathBuf,
    #[arg(long)]
    rev:       String,
    /// Delete the revision's existing theorems first.
    #[arg(long)]
    replace:   bool,
  },

  /// Build the vector collection for one revision, or for all of them.
  Index {
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    rev: Option<String>,
    #[arg(long)]
    all: bool,
  },

  /// Write every feedback row to a JSON Lines file.
  ExportFeedback {
    #[arg(long)]
    save_path: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Ingest { data_path, rev, replace } => {
      let rev = Revision::parse(rev).context("invalid --rev")?;
      let path = expand_tilde(&data_path);
      let file = File::open(&path).with_context(|| format!("failed to open {path:?}"))?;
      let theorems = ingest::read_theorems(BufReader::new(file))
        .with_context(|| format!("failed to parse {path:?}"))?;
      let count = ingest::load(&store, &rev, theorems, replace)
        .await
        .context("failed to store theorems")?;
      tracing::info!(rev = %rev, count, "ingested theorems");
      Ok(())
    }
    Command::ExportFeedback { save_path } => {
      let rows = store.list_feedback().await.context("failed to read feedback")?;
      let path = expand_tilde(&save_path);
      let file = File::create(&path).with_context(|| format!("failed to create {path:?}"))?;
      let count = export::write_feedback(&rows, BufWriter::new(file))
        .with_context(|| format!("failed to write {path:?}"))?;
      tracing::info!(count, path = %path.display(), "exported feedback");
      Ok(())
    }
    command => with_embedder(cfg, store, command).await,
  }
}

async fn with_embedder(cfg: ServerConfig, store: SqliteStore, command: Command) -> anyhow::Result<()> {
  match cfg.embedding.clone() {
    EmbeddingConfig::Http(http) => {
      let embedder = HttpEmbedder::new(http).context("failed to build embedding client")?;
      with_vectors(cfg, store, embedder, command).await
    }
    EmbeddingConfig::Hashed { dimension } => {
      tracing::warn!(dimension, "using the hashed embedder; results are lexical only");
      let embedder = HashedEmbedder::new(dimension).context("invalid hashed embedder")?;
      with_vectors(cfg, store, embedder, command).await
    }
  }
}

async fn with_vectors<E: Embedder + 'static>(
  cfg: ServerConfig,
  store: SqliteStore,
  embedder: E,
  command: Command,
) -> anyhow::Result<()> {
  match cfg.vector.clone() {
    VectorConfig::Qdrant(qdrant) => {
      let vectors = QdrantStore::new(qdrant).context("failed to build vector store client")?;
      run(cfg, store, embedder, vectors, command).await
    }
    VectorConfig::Memory => run(cfg, store, embedder, MemoryVectorStore::new(), command).await,
  }
}

async fn run<E, V>(
  cfg: ServerConfig,
  store: SqliteStore,
  embedder: E,
  vectors: V,
  command: Command,
) -> anyhow::Result<()>
where
  E: Embedder + 'static,
  V: VectorStore + 'static,
{
  tracing::info!(model = embedder.model_name(), dimension = embedder.dimension(), "embedder ready");
  let engine = Arc::new(Engine::new(
    Arc::new(embedder),
    Arc::new(vectors),
    Arc::new(store),
    cfg.retriever(),
  ));

  match command {
    Command::Index { rev: Some(rev), .. } => {
      let rev = Revision::parse(rev).context("invalid --rev")?;
      engine
        .indexer
        .index(&rev)
        .await
        .with_context(|| format!("failed to index {rev}"))?;
      Ok(())
    }
    Command::Index { rev: None, .. } => {
      let reports = engine.indexer.index_all().await.context("failed to index revisions")?;
      tracing::info!(revisions = reports.len(), "indexed all revisions");
      Ok(())
    }
    _ => serve(cfg, engine).await,
  }
}

async fn serve<E, V>(cfg: ServerConfig, engine: Arc<Engine<E, V, SqliteStore>>) -> anyhow::Result<()>
where
  E: Embedder + 'static,
  V: VectorStore + 'static,
{
  if cfg.index_on_startup {
    let reports = engine
      .indexer
      .index_all()
      .await
      .context("failed to index revisions at startup")?;
    tracing::info!(revisions = reports.len(), "startup indexing complete");
  }

  let state = AppState { engine, request_timeout: cfg.request_timeout() };
  let app = statesearch_server::app(api_router(state));
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

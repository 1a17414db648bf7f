//! # Meeting Recall CLI (`recall`)
//!
//! The `recall` binary manages meeting records and the semantic index over
//! them. Records always land in SQLite first; the vector index is a derived
//! projection that `reindex` can rebuild at any time.
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the SQLite database and run schema migrations |
//! | `recall add <body>` | Save a meeting record and index it |
//! | `recall show <id>` | Print a meeting record |
//! | `recall delete <id>` | Delete a record and its index entry |
//! | `recall search "<query>"` | Semantic search over indexed meetings |
//! | `recall reindex` | Re-project every record into the vector index |
//! | `recall status` | Record counts, index stats, and dimension check |
//! | `recall serve` | Start the HTTP search API |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! recall init --config ./config/recall.toml
//!
//! # Add a meeting from a transcript file
//! cat standup.txt | recall add - --title "Daily standup"
//!
//! # Find meetings by meaning, not keywords
//! recall search "what did we decide about the Q3 roadmap" --top-k 3
//!
//! # Start the search API for the notes UI
//! recall serve --config ./config/recall.toml
//! ```

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use meeting_recall::config::{self, Config};
use meeting_recall::db;
use meeting_recall::embed::{Embedder, LocalEmbedder};
use meeting_recall::index::remote::RemoteIndex;
use meeting_recall::index::VectorIndex;
use meeting_recall::indexer::{IndexOutcome, Indexer};
use meeting_recall::migrate;
use meeting_recall::models::MeetingRecord;
use meeting_recall::records::{RecordStore, SqliteRecordStore};
use meeting_recall::retriever::{merge_with_records, Retriever};
use meeting_recall::server;

/// Meeting Recall CLI — semantic indexing and retrieval for meeting records.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/recall.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Meeting Recall — semantic indexing and retrieval for meeting records",
    version,
    long_about = "Meeting Recall stores meeting records in SQLite, embeds them with a local \
    model, and projects them into a remote vector index so meetings can be found by meaning \
    rather than keywords. Search is available from the CLI and an HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the meetings table. Idempotent;
    /// running it again is safe.
    Init,

    /// Save a meeting record and index it.
    ///
    /// The record is written to SQLite first and kept even when indexing
    /// fails; a later `recall reindex` repairs the index. Records with an
    /// empty body are stored but deliberately left out of the index.
    Add {
        /// Transcript body. Pass `-` to read it from stdin.
        body: String,

        /// Meeting title. Defaults to an "Untitled Meeting" placeholder;
        /// placeholder titles get a display title derived from the body.
        #[arg(long)]
        title: Option<String>,

        /// Short summary shown in search results. Derived from the body
        /// when omitted.
        #[arg(long)]
        summary: Option<String>,
    },

    /// Print a meeting record.
    Show {
        /// Meeting id.
        id: String,
    },

    /// Delete a meeting record and its index entry.
    Delete {
        /// Meeting id.
        id: String,
    },

    /// Semantic search over indexed meetings.
    ///
    /// Embeds the query with the same local model used for indexing and
    /// returns the closest meetings with relevance scores.
    Search {
        /// The search query. Must not be blank.
        query: String,

        /// Maximum number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Re-project every record into the vector index.
    ///
    /// Walks all records oldest first and upserts each one. A failure on one
    /// record does not stop the pass; counts are reported at the end.
    Reindex,

    /// Show record counts, index stats, and the embedding dimension check.
    Status,

    /// Start the HTTP search API.
    ///
    /// Binds to `[server].bind` and serves `POST /search` and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            body,
            title,
            summary,
        } => {
            run_add(&cfg, body, title, summary).await?;
        }
        Commands::Show { id } => {
            run_show(&cfg, &id).await?;
        }
        Commands::Delete { id } => {
            run_delete(&cfg, &id).await?;
        }
        Commands::Search { query, top_k } => {
            run_search(&cfg, &query, top_k).await?;
        }
        Commands::Reindex => {
            run_reindex(&cfg).await?;
        }
        Commands::Status => {
            run_status(&cfg).await?;
        }
        Commands::Serve => {
            run_serve(&cfg).await?;
        }
    }

    Ok(())
}

// ============ Shared builders ============

fn build_embedder(cfg: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    Ok(Arc::new(LocalEmbedder::new(&cfg.embedding)?))
}

fn build_index(cfg: &Config) -> anyhow::Result<Arc<dyn VectorIndex>> {
    Ok(Arc::new(RemoteIndex::connect(&cfg.index)?))
}

fn build_indexer(cfg: &Config) -> anyhow::Result<Indexer> {
    Ok(Indexer::new(build_embedder(cfg)?, build_index(cfg)?))
}

fn build_retriever(cfg: &Config) -> anyhow::Result<Retriever> {
    Ok(Retriever::new(
        build_embedder(cfg)?,
        build_index(cfg)?,
        cfg.retrieval.top_k,
    ))
}

// ============ Commands ============

async fn run_add(
    cfg: &Config,
    body: String,
    title: Option<String>,
    summary: Option<String>,
) -> anyhow::Result<()> {
    let body = if body == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        body
    };

    let now = chrono::Utc::now();
    let record = MeetingRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.unwrap_or_else(|| format!("Untitled Meeting - {}", now.timestamp_millis())),
        summary: summary.unwrap_or_default(),
        body,
        created_at: now,
    };

    // Configuration problems (missing API key, unknown model) fail here,
    // before anything is written.
    let indexer = build_indexer(cfg)?;

    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);
    store.insert(&record).await?;

    // The record is saved no matter what the index does next.
    let outcome = indexer.index_record(&record).await;

    println!("add {}", record.id);
    println!("  title: {}", record.title);
    println!("  index: {}", outcome_label(outcome));
    println!("ok");
    Ok(())
}

fn outcome_label(outcome: IndexOutcome) -> &'static str {
    match outcome {
        IndexOutcome::Indexed => "indexed",
        IndexOutcome::Skipped => "skipped (empty body)",
        IndexOutcome::Failed => "failed (record saved; run `recall reindex` later)",
    }
}

async fn run_show(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);

    let record = match store.get(id).await? {
        Some(record) => record,
        None => anyhow::bail!("meeting not found: {}", id),
    };

    println!("--- Meeting ---");
    println!("id:         {}", record.id);
    println!("title:      {}", record.title);
    println!(
        "created_at: {}",
        record.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );
    if !record.summary.trim().is_empty() {
        println!("summary:    {}", record.summary);
    }
    println!();
    println!("--- Body ---");
    println!("{}", record.body);
    Ok(())
}

async fn run_delete(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);

    if !store.delete(id).await? {
        anyhow::bail!("meeting not found: {}", id);
    }

    // The record is gone either way; a leftover index entry only means a
    // stale hit until it is overwritten or deleted again.
    let index = build_index(cfg)?;
    match index.delete(id).await {
        Ok(()) => println!("deleted {}", id),
        Err(err) => {
            tracing::warn!("index cleanup for meeting {} failed: {}", id, err);
            println!("deleted {} (index entry may linger)", id);
        }
    }
    Ok(())
}

async fn run_search(cfg: &Config, query: &str, top_k: Option<usize>) -> anyhow::Result<()> {
    let retriever = build_retriever(cfg)?;
    let hits = retriever.search(query, top_k).await?;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    // Hydrate from the record store so edits made since indexing show up.
    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);
    let hits = merge_with_records(hits, &store).await?;

    for (i, hit) in hits.iter().enumerate() {
        println!("{}. [{:.3}] {}", i + 1, hit.score, hit.title);
        if let Some(created) = hit.created_at {
            println!("    created: {}", created.format("%Y-%m-%d"));
        }
        println!("    summary: {}", hit.summary.replace('\n', " "));
        println!("    id: {}", hit.document_id);
        println!();
    }
    Ok(())
}

async fn run_reindex(cfg: &Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);
    let records = store.list_all().await?;

    let indexer = build_indexer(cfg)?;
    let report = indexer.reindex_all(&records).await;

    println!("reindex");
    println!("  records: {}", report.processed);
    println!("  indexed: {}", report.indexed);
    println!("  skipped: {}", report.skipped);
    println!("  failed:  {}", report.failed);
    println!("ok");
    Ok(())
}

async fn run_status(cfg: &Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let store = SqliteRecordStore::new(pool);
    let counts = store.counts().await?;

    let embedder = build_embedder(cfg)?;
    let index = build_index(cfg)?;
    let stats = index.stats().await?;

    println!("Meeting Recall — Status");
    println!("=======================");
    println!();
    println!("  Database:   {}", cfg.db.path.display());
    println!("  Meetings:   {}", counts.total);
    println!("  Indexable:  {}", counts.indexable);
    println!();
    println!("  Index:      {}", cfg.index.name);
    println!("  Metric:     {}", cfg.index.metric);
    println!("  Vectors:    {}", stats.total_vectors);
    match stats.dimension {
        Some(dim) => println!("  Dimension:  {}", dim),
        None => println!("  Dimension:  (empty index)"),
    }
    println!();
    println!("  Model:      {}", embedder.model_name());
    println!("  Dims:       {}", embedder.dims());

    if let Some(dim) = stats.dimension {
        if dim != embedder.dims() {
            println!();
            println!(
                "  WARNING: index dimension {} does not match model dims {}.",
                dim,
                embedder.dims()
            );
            println!("  Vectors from different models are not comparable; run `recall reindex`.");
        }
    }
    println!();
    Ok(())
}

async fn run_serve(cfg: &Config) -> anyhow::Result<()> {
    let pool = db::connect(cfg).await?;
    let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(pool));
    let retriever = Arc::new(build_retriever(cfg)?);

    server::run_server(cfg, retriever, records).await
}

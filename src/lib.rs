//! # Meeting Recall
//!
//! Semantic indexing and retrieval for meeting records.
//!
//! Meeting Recall keeps the authoritative copy of every meeting (title,
//! summary, transcript body) in SQLite, projects each record into a remote
//! vector index as a single embedding, and answers natural-language queries
//! with the closest meetings. Indexing is best-effort and repairable;
//! retrieval is strict.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────────┐
//! │  SQLite   │──▶│   Normalizer    │──▶│ Local model   │
//! │ (records) │   │ title/summary  │   │ (embeddings) │
//! └────┬─────┘   └────────────────┘   └──────┬───────┘
//!      │                                     │
//!      │              ┌──────────────────────┘
//!      │              ▼
//!      │        ┌───────────┐
//!      └───────▶│  Remote    │◀── query ── CLI / HTTP
//!   merge hits  │vector index│
//!               └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recall init                        # create database
//! recall add "notes..." --title "Q3 sync"
//! recall search "what did we decide about the roadmap"
//! recall reindex                     # re-project every record
//! recall serve                       # start HTTP search API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`normalize`] | Title/summary fallbacks and embedding text |
//! | [`embed`] | Local embedding model |
//! | [`index`] | Vector index client (remote + in-memory) |
//! | [`indexer`] | Best-effort record-to-index projection |
//! | [`retriever`] | Semantic search and score conversion |
//! | [`records`] | SQLite system of record |
//! | [`server`] | HTTP search API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embed;
pub mod error;
pub mod index;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod records;
pub mod retriever;
pub mod server;

//! Vector index abstraction and score semantics.
//!
//! The index is an external service reached through [`VectorIndex`]:
//! [`remote::RemoteIndex`] speaks the HTTP data-plane protocol, and
//! [`memory::InMemoryIndex`] is a brute-force implementation for tests and
//! offline runs.
//!
//! Raw scores mean different things per distance metric, so every score
//! passes through [`SimilarityMetric::relevance`] exactly once before it
//! reaches a caller. Similarity metrics pass through unchanged; distance
//! metrics invert. The two directions are never mixed.

pub mod memory;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::DocumentMetadata;

/// One vector plus its metadata, keyed by the record id. Upserting the same
/// id again overwrites the previous entry.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: DocumentMetadata,
}

/// One nearest-neighbor match as returned by the index, raw score included.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    pub id: String,
    pub score: f64,
    pub metadata: Option<DocumentMetadata>,
}

/// Index-level counters for the status command.
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub dimension: Option<usize>,
    pub total_vectors: u64,
}

/// Client seam for the remote vector index. Tests inject fakes here.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Write or overwrite one vector with its metadata.
    async fn upsert(&self, entry: &IndexEntry) -> Result<()>;

    /// Return up to `top_k` nearest neighbors, best first, with metadata.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;

    /// Remove a vector by id. Removing an absent id is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Index-wide counters (dimension, vector count).
    async fn stats(&self) -> Result<IndexStats>;

    /// The distance metric this index scores with.
    fn metric(&self) -> SimilarityMetric;
}

/// Distance metric configured on the index.
///
/// Vectors are L2-normalized by the embedding provider, so `cosine` is the
/// default and its scores are already similarities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Dotproduct,
    Euclidean,
}

impl SimilarityMetric {
    /// Convert a raw index score into a relevance score where higher is
    /// always more relevant. Cosine and dot product already report
    /// similarity and pass through; euclidean reports a distance and is
    /// inverted. This is the only place raw scores are interpreted.
    pub fn relevance(&self, raw: f64) -> f64 {
        match self {
            SimilarityMetric::Cosine | SimilarityMetric::Dotproduct => raw,
            SimilarityMetric::Euclidean => 1.0 - raw,
        }
    }
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Dotproduct => "dotproduct",
            SimilarityMetric::Euclidean => "euclidean",
        };
        write!(f, "{}", name)
    }
}

/// Round a relevance score to three decimal places for display.
pub fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

//! Semantic search over indexed meetings.
//!
//! The retriever embeds the query, asks the vector index for the nearest
//! entries, and converts each raw store score into a relevance score in one
//! place, [`SimilarityMetric::relevance`]. Whether the backing index reports
//! similarities or distances is a property of its configured metric, never
//! something guessed from the numbers themselves. Hits keep the order the
//! index returned them in.

use std::sync::Arc;

use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::index::{round_score, IndexMatch, SimilarityMetric, VectorIndex};
use crate::models::SearchHit;
use crate::records::RecordStore;

pub const DEFAULT_TOP_K: usize = 5;

const MISSING_TITLE: &str = "Untitled Meeting";
const MISSING_SUMMARY: &str = "No summary available.";

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        default_top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            default_top_k,
        }
    }

    /// Runs a semantic search. Blank queries are rejected before any
    /// embedding work happens. Embedding and index failures propagate to the
    /// caller; unlike indexing, there is no useful partial result here.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery);
        }

        let vector = self.embedder.embed(query).await?;
        if vector.is_empty() {
            return Ok(Vec::new());
        }

        let k = top_k.unwrap_or(self.default_top_k);
        let matches = self.index.query(&vector, k).await?;
        let metric = self.index.metric();
        Ok(matches
            .into_iter()
            .map(|m| hit_from_match(m, metric))
            .collect())
    }
}

fn hit_from_match(m: IndexMatch, metric: SimilarityMetric) -> SearchHit {
    let score = round_score(metric.relevance(m.score));
    let metadata = m.metadata.unwrap_or_default();
    let document_id = if metadata.document_id.is_empty() {
        m.id
    } else {
        metadata.document_id
    };
    SearchHit {
        document_id,
        title: display_title(&metadata.title),
        summary: display_summary(&metadata.summary),
        body: metadata.body,
        created_at: metadata.created_at,
        score,
    }
}

fn display_title(raw: &str) -> String {
    if raw.trim().is_empty() {
        MISSING_TITLE.to_string()
    } else {
        raw.to_string()
    }
}

fn display_summary(raw: &str) -> String {
    if raw.trim().is_empty() {
        MISSING_SUMMARY.to_string()
    } else {
        raw.to_string()
    }
}

/// Replaces each hit's snapshot fields with the current record where one
/// still exists. Index metadata can lag behind edits; the record store wins.
/// Hits whose record has since been deleted keep their snapshot.
pub async fn merge_with_records(
    hits: Vec<SearchHit>,
    records: &dyn RecordStore,
) -> Result<Vec<SearchHit>> {
    let mut merged = Vec::with_capacity(hits.len());
    for hit in hits {
        match records.get(&hit.document_id).await? {
            Some(record) => merged.push(SearchHit {
                document_id: record.id,
                title: display_title(&record.title),
                summary: display_summary(&record.summary),
                body: record.body,
                created_at: Some(record.created_at),
                score: hit.score,
            }),
            None => merged.push(hit),
        }
    }
    Ok(merged)
}

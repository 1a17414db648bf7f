//! Projects meeting records into the vector index.
//!
//! Indexing is best-effort: a meeting is saved to the record store first and
//! [`Indexer::index_record`] never propagates an error back to that write.
//! Failures are logged and surfaced as an [`IndexOutcome`], and a later
//! `reindex` pass repairs whatever was missed.

use std::sync::Arc;

use tracing::{info, warn};

use crate::embed::Embedder;
use crate::error::Result;
use crate::index::{IndexEntry, VectorIndex};
use crate::models::{DocumentMetadata, MeetingRecord};
use crate::normalize;

/// What happened to a single record during indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// Embedded and upserted into the index.
    Indexed,
    /// Nothing to embed (blank body), deliberately left out of the index.
    Skipped,
    /// Embedding or upsert failed; the record store is still authoritative.
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub processed: u64,
    pub indexed: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Indexes one record, swallowing failures. Callers that need the error
    /// itself should use [`Indexer::try_index`].
    pub async fn index_record(&self, record: &MeetingRecord) -> IndexOutcome {
        match self.try_index(record).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("indexing meeting {} failed: {}", record.id, err);
                IndexOutcome::Failed
            }
        }
    }

    pub async fn try_index(&self, record: &MeetingRecord) -> Result<IndexOutcome> {
        let doc = match normalize::normalize(record) {
            Some(doc) => doc,
            None => {
                warn!("meeting {} has an empty body, skipping index", record.id);
                return Ok(IndexOutcome::Skipped);
            }
        };

        let vector = self.embedder.embed(&doc.embed_text).await?;
        if vector.is_empty() {
            warn!("meeting {} produced no embedding, skipping index", record.id);
            return Ok(IndexOutcome::Skipped);
        }

        let entry = IndexEntry {
            id: record.id.clone(),
            vector,
            metadata: DocumentMetadata {
                document_id: record.id.clone(),
                title: doc.title,
                summary: doc.summary,
                body: record.body.clone(),
                created_at: Some(record.created_at),
            },
        };
        self.index.upsert(&entry).await?;
        info!("indexed meeting {}", record.id);
        Ok(IndexOutcome::Indexed)
    }

    /// Re-projects every given record, one at a time. A failure on one record
    /// is counted and the pass moves on to the next.
    pub async fn reindex_all(&self, records: &[MeetingRecord]) -> ReindexReport {
        let mut report = ReindexReport::default();
        for record in records {
            report.processed += 1;
            match self.index_record(record).await {
                IndexOutcome::Indexed => report.indexed += 1,
                IndexOutcome::Skipped => report.skipped += 1,
                IndexOutcome::Failed => report.failed += 1,
            }
        }
        report
    }
}

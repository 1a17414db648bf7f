//! Full-pipeline tests over the library: records in temporary SQLite, a
//! deterministic bag-of-words embedder, and the in-memory vector index.
//! No network, no model downloads.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;

use meeting_recall::embed::{normalize_l2, Embedder};
use meeting_recall::error::{Error, Result};
use meeting_recall::index::memory::InMemoryIndex;
use meeting_recall::index::{round_score, VectorIndex};
use meeting_recall::indexer::{IndexOutcome, Indexer};
use meeting_recall::models::MeetingRecord;
use meeting_recall::records::{RecordStore, SqliteRecordStore};
use meeting_recall::retriever::{merge_with_records, Retriever, DEFAULT_TOP_K};

/// Deterministic embedder: hashes whitespace tokens into a fixed number of
/// buckets and L2-normalizes the counts. Texts sharing words come out close
/// in cosine space, which is all these tests need.
struct HashEmbedder {
    dims: usize,
    calls: AtomicUsize,
}

impl HashEmbedder {
    fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut v = vec![0.0f32; self.dims];
        for token in text.to_lowercase().split_whitespace() {
            let mut h: u64 = 0;
            for b in token.bytes() {
                h = h.wrapping_mul(31).wrapping_add(b as u64);
            }
            v[(h % self.dims as u64) as usize] += 1.0;
        }
        Ok(normalize_l2(v))
    }

    fn model_name(&self) -> &str {
        "hash-bow"
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Embedder that chokes on a marker token, for failure-isolation tests.
struct FaultyEmbedder {
    inner: HashEmbedder,
}

#[async_trait]
impl Embedder for FaultyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains("corrupted-transcript-marker") {
            return Err(Error::Embedding("tokenizer rejected input".to_string()));
        }
        self.inner.embed(text).await
    }

    fn model_name(&self) -> &str {
        "hash-bow-faulty"
    }

    fn dims(&self) -> usize {
        self.inner.dims
    }
}

async fn test_store() -> (TempDir, SqliteRecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recall.db");
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    meeting_recall::migrate::apply(&pool).await.unwrap();
    (dir, SqliteRecordStore::new(pool))
}

fn record(id: &str, title: &str, summary: &str, body: &str, secs: i64) -> MeetingRecord {
    MeetingRecord {
        id: id.to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
        body: body.to_string(),
        created_at: DateTime::from_timestamp(secs, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_round_trip_index_and_search() {
    let (_dir, store) = test_store().await;
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    let meetings = vec![
        record(
            "roadmap",
            "Planning sync",
            "Q3 roadmap priorities.",
            "We walked the Q3 roadmap and decided to ship the importer first.",
            1_700_000_000,
        ),
        record(
            "hiring",
            "Hiring review",
            "Pipeline and headcount.",
            "Reviewed the hiring pipeline and agreed on two backend openings.",
            1_700_000_100,
        ),
        record(
            "incident",
            "Incident retro",
            "Postmortem for the outage.",
            "Retro for the database outage, action items on alerting.",
            1_700_000_200,
        ),
    ];
    for m in &meetings {
        store.insert(m).await.unwrap();
        assert_eq!(indexer.index_record(m).await, IndexOutcome::Indexed);
    }

    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever
        .search("what did we decide about the Q3 roadmap", None)
        .await
        .unwrap();

    assert!(!hits.is_empty());
    assert_eq!(hits[0].document_id, "roadmap");
    assert_eq!(hits[0].title, "Planning sync");
    assert!(hits[0].score > 0.0);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let merged = merge_with_records(hits, &store).await.unwrap();
    assert_eq!(merged[0].summary, "Q3 roadmap priorities.");
    assert_eq!(
        merged[0].created_at.map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}

#[tokio::test]
async fn test_indexing_same_meeting_twice_keeps_one_entry() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    let first = record("m1", "Sync", "", "first draft of the notes", 1_700_000_000);
    let second = record("m1", "Sync", "", "final corrected notes", 1_700_000_000);

    indexer.index_record(&first).await;
    indexer.index_record(&second).await;

    let stats = index.stats().await.unwrap();
    assert_eq!(stats.total_vectors, 1);

    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever.search("final corrected notes", None).await.unwrap();
    assert_eq!(hits[0].body, "final corrected notes");
}

#[tokio::test]
async fn test_empty_body_never_reaches_embedder_or_index() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    let outcome = indexer
        .index_record(&record("m1", "Cancelled", "", "   \n\t ", 1_700_000_000))
        .await;

    assert_eq!(outcome, IndexOutcome::Skipped);
    assert_eq!(embedder.call_count(), 0);
    assert_eq!(index.stats().await.unwrap().total_vectors, 0);
}

#[tokio::test]
async fn test_fallback_titles_flow_into_search_results() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    // Placeholder title and a too-short summary both fall back to the body.
    let rec = record(
        "m1",
        "Untitled Meeting - 1712345678901",
        "Short.",
        "Quarterly budget review with finance team leads today",
        1_700_000_000,
    );
    indexer.index_record(&rec).await;

    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever
        .search("quarterly budget review", None)
        .await
        .unwrap();

    assert_eq!(hits[0].title, "Quarterly budget review with finance team...");
    assert_eq!(
        hits[0].summary,
        "Quarterly budget review with finance team leads today..."
    );
}

#[tokio::test]
async fn test_reindex_counts_survive_bad_records() {
    let (_dir, store) = test_store().await;
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(
        Arc::new(FaultyEmbedder {
            inner: HashEmbedder::new(64),
        }),
        index.clone(),
    );

    store
        .insert(&record("good-1", "A", "", "useful notes", 1_700_000_000))
        .await
        .unwrap();
    store
        .insert(&record("blank", "B", "", "   ", 1_700_000_100))
        .await
        .unwrap();
    store
        .insert(&record(
            "bad",
            "C",
            "",
            "corrupted-transcript-marker in the body",
            1_700_000_200,
        ))
        .await
        .unwrap();
    store
        .insert(&record("good-2", "D", "", "more useful notes", 1_700_000_300))
        .await
        .unwrap();

    let records = store.list_all().await.unwrap();
    let report = indexer.reindex_all(&records).await;

    assert_eq!(report.processed, 4);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(index.stats().await.unwrap().total_vectors, 2);
}

#[tokio::test]
async fn test_blank_query_never_calls_embedder() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let retriever = Retriever::new(embedder.clone(), Arc::new(InMemoryIndex::new()), 5);

    let err = retriever.search("   ", None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidQuery));
    assert_eq!(embedder.call_count(), 0);
}

#[tokio::test]
async fn test_scores_are_rounded_to_three_decimals() {
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    for (id, body) in [
        ("a", "alpha beta gamma delta"),
        ("b", "alpha beta something else entirely"),
        ("c", "completely unrelated words here"),
    ] {
        indexer
            .index_record(&record(id, "T", "", body, 1_700_000_000))
            .await;
    }

    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever.search("alpha beta gamma", None).await.unwrap();

    assert!(!hits.is_empty());
    for hit in &hits {
        assert_eq!(hit.score, round_score(hit.score));
    }
}

#[tokio::test]
async fn test_delete_removes_record_and_index_entry() {
    let (_dir, store) = test_store().await;
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    let rec = record("m1", "Sync", "", "notes about the launch", 1_700_000_000);
    store.insert(&rec).await.unwrap();
    indexer.index_record(&rec).await;

    assert!(store.delete("m1").await.unwrap());
    index.delete("m1").await.unwrap();

    assert!(store.get("m1").await.unwrap().is_none());
    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever.search("notes about the launch", None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_reflects_record_edits_made_after_indexing() {
    let (_dir, store) = test_store().await;
    let embedder = Arc::new(HashEmbedder::new(64));
    let index = Arc::new(InMemoryIndex::new());
    let indexer = Indexer::new(embedder.clone(), index.clone());

    let original = record("m1", "Draft title", "", "notes about the launch", 1_700_000_000);
    store.insert(&original).await.unwrap();
    indexer.index_record(&original).await;

    // Edit the record without reindexing; the index metadata is now stale.
    let edited = record(
        "m1",
        "Final title",
        "Launch decisions.",
        "notes about the launch",
        1_700_000_000,
    );
    store.insert(&edited).await.unwrap();

    let retriever = Retriever::new(embedder, index, DEFAULT_TOP_K);
    let hits = retriever.search("notes about the launch", None).await.unwrap();
    assert_eq!(hits[0].title, "Draft title");

    let merged = merge_with_records(hits, &store).await.unwrap();
    assert_eq!(merged[0].title, "Final title");
    assert_eq!(merged[0].summary, "Launch decisions.");
}

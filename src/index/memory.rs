//! In-memory [`VectorIndex`] for tests and offline runs.
//!
//! Entries live in a `HashMap` behind `std::sync::RwLock`, so upserting an
//! existing id overwrites it, matching the remote index's last-write-wins
//! behavior. Queries are brute-force cosine similarity over every stored
//! vector, best first.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embed::cosine_similarity;
use crate::error::Result;
use crate::models::DocumentMetadata;

use super::{IndexEntry, IndexMatch, IndexStats, SimilarityMetric, VectorIndex};

struct StoredEntry {
    vector: Vec<f32>,
    metadata: DocumentMetadata,
}

#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            entry.id.clone(),
            StoredEntry {
                vector: entry.vector.clone(),
                metadata: entry.metadata.clone(),
            },
        );
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let entries = self.entries.read().unwrap();
        let mut matches: Vec<IndexMatch> = entries
            .iter()
            .map(|(id, stored)| IndexMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &stored.vector) as f64,
                metadata: Some(stored.metadata.clone()),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(id);
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let entries = self.entries.read().unwrap();
        let dimension = entries.values().next().map(|e| e.vector.len());
        Ok(IndexStats {
            dimension,
            total_vectors: entries.len() as u64,
        })
    }

    fn metric(&self) -> SimilarityMetric {
        SimilarityMetric::Cosine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            metadata: DocumentMetadata {
                document_id: id.to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = InMemoryIndex::new();
        index.upsert(&entry("far", vec![0.0, 1.0])).await.unwrap();
        index.upsert(&entry("near", vec![1.0, 0.0])).await.unwrap();
        index
            .upsert(&entry("middle", vec![0.7, 0.7]))
            .await
            .unwrap();

        let matches = index.query(&[1.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "middle", "far"]);
    }

    #[tokio::test]
    async fn test_query_truncates_to_top_k() {
        let index = InMemoryIndex::new();
        for i in 0..10 {
            index
                .upsert(&entry(&format!("e{}", i), vec![1.0, i as f32]))
                .await
                .unwrap();
        }
        let matches = index.query(&[1.0, 0.0], 3).await.unwrap();
        assert_eq!(matches.len(), 3);
    }

    #[tokio::test]
    async fn test_upsert_same_id_overwrites() {
        let index = InMemoryIndex::new();
        index.upsert(&entry("m1", vec![1.0, 0.0])).await.unwrap();
        index.upsert(&entry("m1", vec![0.0, 1.0])).await.unwrap();

        let stats = index.stats().await.unwrap();
        assert_eq!(stats.total_vectors, 1);

        let matches = index.query(&[0.0, 1.0], 1).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_tolerates_absent_id() {
        let index = InMemoryIndex::new();
        index.upsert(&entry("m1", vec![1.0, 0.0])).await.unwrap();
        index.delete("m1").await.unwrap();
        index.delete("m1").await.unwrap();
        assert_eq!(index.stats().await.unwrap().total_vectors, 0);
    }

    #[tokio::test]
    async fn test_stats_reports_dimension() {
        let index = InMemoryIndex::new();
        assert_eq!(index.stats().await.unwrap().dimension, None);
        index.upsert(&entry("m1", vec![1.0, 0.0, 0.5])).await.unwrap();
        assert_eq!(index.stats().await.unwrap().dimension, Some(3));
    }
}

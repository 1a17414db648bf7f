//! HTTP client for the remote vector index data plane.
//!
//! Speaks the JSON protocol of managed vector databases: `POST
//! /vectors/upsert`, `POST /query`, `POST /vectors/delete`, and `POST
//! /describe_index_stats`, authenticated with an `Api-Key` header.
//!
//! The handle is built once at startup by [`RemoteIndex::connect`], which
//! fails fast on missing configuration. Requests carry per-operation
//! timeouts (upserts are given longer than queries); the client never
//! retries, so callers decide whether a failure is fatal.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::models::DocumentMetadata;

use super::{IndexEntry, IndexMatch, IndexStats, SimilarityMetric, VectorIndex};

#[derive(Debug)]
pub struct RemoteIndex {
    name: String,
    endpoint: String,
    api_key: String,
    metric: SimilarityMetric,
    upsert_timeout: Duration,
    query_timeout: Duration,
    client: reqwest::Client,
}

impl RemoteIndex {
    /// Build a client from configuration, resolving the API key from the
    /// environment variable named by `index.api_key_env`.
    ///
    /// Missing index name, endpoint, or API key is a configuration error:
    /// a process that cannot reach its index should fail at startup, not
    /// on the first write.
    pub fn connect(config: &IndexConfig) -> Result<Self> {
        let name = config.name.trim();
        if name.is_empty() {
            return Err(Error::Config("index.name must not be empty".to_string()));
        }

        let endpoint = config.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(Error::Config(
                "index.endpoint must not be empty".to_string(),
            ));
        }

        let api_key = std::env::var(&config.api_key_env).unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "index API key missing: set the {} environment variable",
                config.api_key_env
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Store(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            api_key,
            metric: config.metric,
            upsert_timeout: Duration::from_secs(config.upsert_timeout_secs),
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            client,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
        op: &str,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.endpoint, path);

        let resp = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(op, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "index '{}' {} failed: {}: {}",
                self.name, op, status, body_text
            )));
        }

        Ok(resp)
    }

    fn request_error(&self, op: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Store(format!("index '{}' {} timed out: {}", self.name, op, e))
        } else {
            Error::Store(format!("index '{}' {} failed: {}", self.name, op, e))
        }
    }
}

#[async_trait]
impl VectorIndex for RemoteIndex {
    async fn upsert(&self, entry: &IndexEntry) -> Result<()> {
        let body = UpsertRequest {
            vectors: [WireVector {
                id: &entry.id,
                values: &entry.vector,
                metadata: &entry.metadata,
            }],
        };
        self.post_json("/vectors/upsert", &body, self.upsert_timeout, "upsert")
            .await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
        };
        let resp = self
            .post_json("/query", &body, self.query_timeout, "query")
            .await?;

        let parsed: QueryResponse = resp.json().await.map_err(|e| {
            Error::Store(format!("index '{}' query response invalid: {}", self.name, e))
        })?;

        Ok(parsed
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let body = DeleteRequest { ids: [id] };
        self.post_json("/vectors/delete", &body, self.upsert_timeout, "delete")
            .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let resp = self
            .post_json(
                "/describe_index_stats",
                &serde_json::json!({}),
                self.query_timeout,
                "stats",
            )
            .await?;

        let parsed: StatsResponse = resp.json().await.map_err(|e| {
            Error::Store(format!("index '{}' stats response invalid: {}", self.name, e))
        })?;

        Ok(IndexStats {
            dimension: parsed.dimension,
            total_vectors: parsed.total_vector_count,
        })
    }

    fn metric(&self) -> SimilarityMetric {
        self.metric
    }
}

// ============ Wire format ============

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: [WireVector<'a>; 1],
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a DocumentMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    metadata: Option<DocumentMetadata>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: [&'a str; 1],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    total_vector_count: u64,
}

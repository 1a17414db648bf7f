//! Core data models for meeting records, index metadata, and search hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A meeting row as stored in the system of record.
///
/// `title` and `summary` may be empty; the normalizer derives display
/// values from the body in that case. `body` is the full transcript text.
#[derive(Debug, Clone)]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata stored alongside each vector and returned verbatim on query.
///
/// Field names are fixed by the index wire format (`documentId`, `createdAt`);
/// consumers on the query side must tolerate absent fields, so everything
/// defaults to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One search result after score conversion and metadata resolution.
///
/// `score` is a display relevance: higher is more relevant, rounded to
/// three decimal places. Hits keep the ordering the index returned.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub document_id: String,
    pub title: String,
    pub summary: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub score: f64,
}

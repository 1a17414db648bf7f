//! System-of-record storage for meeting records.
//!
//! SQLite holds the authoritative copy of every meeting. The vector index
//! only ever carries derived data, so anything here can be re-projected into
//! the index with `reindex`. Timestamps are stored as unix seconds and
//! converted to [`chrono::DateTime`] at this boundary.

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::MeetingRecord;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts a record, replacing any existing record with the same id.
    async fn insert(&self, record: &MeetingRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<MeetingRecord>>;

    /// Every record, oldest first. Reindexing feeds all of them through the
    /// indexer, which decides per record whether there is anything to embed.
    async fn list_all(&self) -> Result<Vec<MeetingRecord>>;

    /// Returns true if a record was actually removed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordCounts {
    pub total: u64,
    pub indexable: u64,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn counts(&self) -> Result<RecordCounts> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM meetings")
            .fetch_one(&self.pool)
            .await?;
        let indexable: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM meetings WHERE TRIM(body) <> ''")
                .fetch_one(&self.pool)
                .await?;
        Ok(RecordCounts {
            total: total as u64,
            indexable: indexable as u64,
        })
    }
}

fn record_from_row(row: &SqliteRow) -> MeetingRecord {
    let created_at: i64 = row.get("created_at");
    MeetingRecord {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        body: row.get("body"),
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, record: &MeetingRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meetings (id, title, summary, body, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                body = excluded.body,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(&record.body)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MeetingRecord>> {
        let row = sqlx::query(
            "SELECT id, title, summary, body, created_at FROM meetings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    async fn list_all(&self) -> Result<Vec<MeetingRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, summary, body, created_at
            FROM meetings
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM meetings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, SqliteRecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        crate::migrate::apply(&pool).await.unwrap();
        (dir, SqliteRecordStore::new(pool))
    }

    fn record(id: &str, body: &str, created_at_secs: i64) -> MeetingRecord {
        MeetingRecord {
            id: id.to_string(),
            title: format!("Meeting {}", id),
            summary: String::new(),
            body: body.to_string(),
            created_at: DateTime::from_timestamp(created_at_secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let (_dir, store) = test_store().await;
        let rec = record("m1", "quarterly planning notes", 1_700_000_000);
        store.insert(&rec).await.unwrap();

        let got = store.get("m1").await.unwrap().unwrap();
        assert_eq!(got.id, "m1");
        assert_eq!(got.title, "Meeting m1");
        assert_eq!(got.body, "quarterly planning notes");
        assert_eq!(got.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (_dir, store) = test_store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_same_id_replaces() {
        let (_dir, store) = test_store().await;
        store
            .insert(&record("m1", "first draft", 1_700_000_000))
            .await
            .unwrap();
        store
            .insert(&record("m1", "second draft", 1_700_000_100))
            .await
            .unwrap();

        let got = store.get("m1").await.unwrap().unwrap();
        assert_eq!(got.body, "second draft");
        assert_eq!(store.counts().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_list_all_orders_oldest_first() {
        let (_dir, store) = test_store().await;
        store
            .insert(&record("newer", "notes", 2_000_000_000))
            .await
            .unwrap();
        store
            .insert(&record("blank", "   \n\t ", 1_500_000_000))
            .await
            .unwrap();
        store
            .insert(&record("older", "notes", 1_000_000_000))
            .await
            .unwrap();

        let records = store.list_all().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["older", "blank", "newer"]);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_record_existed() {
        let (_dir, store) = test_store().await;
        store
            .insert(&record("m1", "notes", 1_700_000_000))
            .await
            .unwrap();
        assert!(store.delete("m1").await.unwrap());
        assert!(!store.delete("m1").await.unwrap());
    }

    #[tokio::test]
    async fn test_counts_distinguish_indexable() {
        let (_dir, store) = test_store().await;
        store
            .insert(&record("a", "notes", 1_700_000_000))
            .await
            .unwrap();
        store
            .insert(&record("b", "", 1_700_000_001))
            .await
            .unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.indexable, 1);
    }
}

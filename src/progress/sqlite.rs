//! SQLite-backed progress tracker

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::{check_progress, rank_recommendations, ProgressTracker, UserProgress};
use crate::error::LadderError;

pub struct SqliteProgressTracker {
    conn: Arc<Mutex<Connection>>,
    catalog: Vec<String>,
}

impl SqliteProgressTracker {
    /// Open (or create) the progress database at `path`
    pub async fn new<P: AsRef<Path>>(path: P, catalog: Vec<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            catalog,
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                progress INTEGER NOT NULL CHECK (progress BETWEEN 0 AND 100),
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, topic)
            );

            CREATE INDEX IF NOT EXISTS idx_user_progress_user ON user_progress(user_id);
        "#)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressTracker for SqliteProgressTracker {
    async fn recommendations_for_user(&self, user_id: &str) -> Result<Vec<String>, LadderError> {
        info!("Fetching recommendations for user {}", user_id);
        let progress: HashMap<String, u32> = self
            .records_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| (r.topic, r.progress))
            .collect();
        Ok(rank_recommendations(&self.catalog, &progress))
    }

    async fn update_user_progress(&self, user_id: &str, topic: &str, progress: u32) -> Result<(), LadderError> {
        check_progress(progress)?;
        info!("Updating progress for user {}: {} -> {}%", user_id, topic, progress);

        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO user_progress (user_id, topic, progress, updated_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(user_id, topic) DO UPDATE SET
                   progress = excluded.progress,
                   updated_at = excluded.updated_at"#,
            params![user_id, topic, progress, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<UserProgress>, LadderError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT user_id, topic, progress, updated_at FROM user_progress WHERE user_id = ?1 ORDER BY topic",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            let updated_at: String = row.get(3)?;
            Ok(UserProgress {
                user_id: row.get(0)?,
                topic: row.get(1)?,
                progress: row.get(2)?,
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        vec!["Pentesting".into(), "Cybersecurity".into(), "Social Engineering".into()]
    }

    async fn stored(tracker: &SqliteProgressTracker, user_id: &str, topic: &str) -> Option<u32> {
        tracker
            .records_for_user(user_id)
            .await
            .unwrap()
            .into_iter()
            .find(|r| r.topic == topic)
            .map(|r| r.progress)
    }

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = SqliteProgressTracker::new(dir.path().join("progress.db"), catalog())
            .await
            .unwrap();

        tracker.update_user_progress("u1", "Pentesting", 10).await.unwrap();
        tracker.update_user_progress("u1", "Pentesting", 30).await.unwrap();
        tracker.update_user_progress("u1", "Cybersecurity", 100).await.unwrap();

        assert_eq!(stored(&tracker, "u1", "Pentesting").await, Some(30));
        assert_eq!(stored(&tracker, "u2", "Pentesting").await, None);

        let records = tracker.records_for_user("u1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].topic, "Cybersecurity");

        let recs = tracker.recommendations_for_user("u1").await.unwrap();
        assert_eq!(recs, vec!["Social Engineering", "Pentesting"]);
    }

    #[tokio::test]
    async fn test_progress_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.db");
        {
            let tracker = SqliteProgressTracker::new(&path, catalog()).await.unwrap();
            tracker.update_user_progress("u1", "Social Engineering", 50).await.unwrap();
        }

        let tracker = SqliteProgressTracker::new(&path, catalog()).await.unwrap();
        assert_eq!(stored(&tracker, "u1", "Social Engineering").await, Some(50));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = SqliteProgressTracker::new(dir.path().join("p.db"), catalog()).await.unwrap();
        let err = tracker.update_user_progress("u1", "Pentesting", 150).await.unwrap_err();
        assert_eq!(err.kind(), "InvalidProgress");
    }
}

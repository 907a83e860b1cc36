//! Learner progress collaborator
//!
//! Keeps a 0-100 progress figure per (user, topic) and turns it into topic
//! recommendations. The engine reports into it after every level advance when
//! one is wired in.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::LadderError;

pub use sqlite::SqliteProgressTracker;

/// One stored progress record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    pub user_id: String,
    pub topic: String,
    pub progress: u32,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProgressTracker: Send + Sync {
    /// Topic names worth studying next, most relevant first
    async fn recommendations_for_user(&self, user_id: &str) -> Result<Vec<String>, LadderError>;

    /// Upsert the progress record for (user, topic)
    async fn update_user_progress(&self, user_id: &str, topic: &str, progress: u32) -> Result<(), LadderError>;

    /// All records for a user
    async fn records_for_user(&self, user_id: &str) -> Result<Vec<UserProgress>, LadderError>;
}

/// Percentage of mastery reached at `level`
pub fn progress_for_level(level: u32, mastery_levels: u32) -> u32 {
    if mastery_levels == 0 {
        return 100;
    }
    let pct = u64::from(level) * 100 / u64::from(mastery_levels);
    pct.min(100) as u32
}

pub(crate) fn check_progress(progress: u32) -> Result<(), LadderError> {
    if progress > 100 {
        return Err(LadderError::InvalidProgress(progress));
    }
    Ok(())
}

/// Unfinished catalog topics ordered by ascending progress, catalog order on ties
pub fn rank_recommendations(catalog: &[String], progress: &HashMap<String, u32>) -> Vec<String> {
    let mut ranked: Vec<(usize, u32, &String)> = catalog
        .iter()
        .enumerate()
        .map(|(i, topic)| (i, progress.get(topic).copied().unwrap_or(0), topic))
        .filter(|(_, p, _)| *p < 100)
        .collect();
    ranked.sort_by_key(|(i, p, _)| (*p, *i));
    ranked.into_iter().map(|(_, _, topic)| topic.clone()).collect()
}

/// Process-local tracker, mostly for sessions without a database
pub struct InMemoryProgressTracker {
    catalog: Vec<String>,
    records: RwLock<HashMap<String, HashMap<String, UserProgress>>>,
}

impl InMemoryProgressTracker {
    pub fn new(catalog: Vec<String>) -> Self {
        Self {
            catalog,
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProgressTracker for InMemoryProgressTracker {
    async fn recommendations_for_user(&self, user_id: &str) -> Result<Vec<String>, LadderError> {
        let records = self.records.read().await;
        let progress: HashMap<String, u32> = records
            .get(user_id)
            .map(|per_topic| {
                per_topic
                    .iter()
                    .map(|(topic, record)| (topic.clone(), record.progress))
                    .collect()
            })
            .unwrap_or_default();
        Ok(rank_recommendations(&self.catalog, &progress))
    }

    async fn update_user_progress(&self, user_id: &str, topic: &str, progress: u32) -> Result<(), LadderError> {
        check_progress(progress)?;
        info!("Updating progress for user {}: {} -> {}%", user_id, topic, progress);

        let mut records = self.records.write().await;
        records.entry(user_id.to_string()).or_default().insert(
            topic.to_string(),
            UserProgress {
                user_id: user_id.to_string(),
                topic: topic.to_string(),
                progress,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn records_for_user(&self, user_id: &str) -> Result<Vec<UserProgress>, LadderError> {
        let records = self.records.read().await;
        let mut list: Vec<UserProgress> = records
            .get(user_id)
            .map(|per_topic| per_topic.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.topic.cmp(&b.topic));
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<String> {
        vec!["Pentesting".into(), "Cybersecurity".into(), "Malware Analysis".into()]
    }

    #[test]
    fn test_progress_for_level() {
        assert_eq!(progress_for_level(0, 10), 0);
        assert_eq!(progress_for_level(3, 10), 30);
        assert_eq!(progress_for_level(1, 3), 33);
        assert_eq!(progress_for_level(25, 10), 100);
        assert_eq!(progress_for_level(1, 0), 100);
        assert_eq!(progress_for_level(u32::MAX, 1), 100);
    }

    #[test]
    fn test_rank_recommendations() {
        let mut progress = HashMap::new();
        progress.insert("Pentesting".to_string(), 40);
        progress.insert("Malware Analysis".to_string(), 100);

        let ranked = rank_recommendations(&catalog(), &progress);
        assert_eq!(ranked, vec!["Cybersecurity", "Pentesting"]);
    }

    #[tokio::test]
    async fn test_new_user_gets_whole_catalog() {
        let tracker = InMemoryProgressTracker::new(catalog());
        let recs = tracker.recommendations_for_user("u1").await.unwrap();
        assert_eq!(recs, catalog());
    }

    #[tokio::test]
    async fn test_update_is_upsert() {
        let tracker = InMemoryProgressTracker::new(catalog());
        tracker.update_user_progress("u1", "Pentesting", 10).await.unwrap();
        tracker.update_user_progress("u1", "Pentesting", 20).await.unwrap();

        let records = tracker.records_for_user("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].progress, 20);
        assert!(tracker.records_for_user("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_progress_above_100() {
        let tracker = InMemoryProgressTracker::new(catalog());
        let err = tracker.update_user_progress("u1", "Pentesting", 101).await.unwrap_err();
        assert!(matches!(err, LadderError::InvalidProgress(101)));
    }
}

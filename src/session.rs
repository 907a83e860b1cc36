//! Wiring a progression engine from configuration

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::oracle::OracleClient;
use crate::progress::{ProgressTracker, SqliteProgressTracker};
use crate::progression::{EngineSettings, ProgressionEngine};
use crate::topics::TopicRegistry;

/// Everything a learning session needs
pub struct LearningSession {
    pub engine: ProgressionEngine,
    /// Learner the progress tracker records for, when one is wired
    pub user_id: Option<String>,
}

impl LearningSession {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(TopicRegistry::new(
            &config.topic_seeds(),
            &config.progression.base_level_title,
        ));
        let oracle = OracleClient::from_config(&config.oracle)?;
        info!("Using oracle at {}", oracle.base_url());

        let mut engine = ProgressionEngine::new(Arc::new(oracle), registry.clone())
            .with_settings(EngineSettings::from(&config.progression));

        let mut user_id = None;
        if config.progress.enabled {
            let catalog = registry.list_topics().await.into_iter().map(|t| t.title).collect();
            let path = config.progress_db_path()?;
            let tracker = SqliteProgressTracker::new(&path, catalog)
                .await
                .with_context(|| format!("Failed to open progress database {}", path.display()))?;
            let tracker: Arc<dyn ProgressTracker> = Arc::new(tracker);

            let id = config
                .progress
                .user_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            info!("Recording progress for user {}", id);
            engine = engine.with_tracker(tracker, id.clone());
            user_id = Some(id);
        }

        Ok(Self { engine, user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_without_tracker() {
        let config = Config::default();
        let session = LearningSession::from_config(&config).await.unwrap();
        assert!(session.user_id.is_none());
        assert_eq!(session.engine.registry().list_topics().await.len(), 5);

        let recs = session.engine.recommendations().await.unwrap();
        assert_eq!(recs[0], "Pentesting");
    }

    #[tokio::test]
    async fn test_session_with_tracker_generates_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.progress.enabled = true;
        config.progress.database_path = Some(dir.path().join("progress.db"));

        let session = LearningSession::from_config(&config).await.unwrap();
        let user = session.user_id.unwrap();
        assert!(Uuid::parse_str(&user).is_ok());
        assert_eq!(session.engine.recommendations().await.unwrap().len(), 5);
    }
}

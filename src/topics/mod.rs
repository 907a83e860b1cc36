//! Topic registry - the catalog shown in the learning menu
//!
//! Topics are seeded once at start-up. The only mutation afterwards is
//! appending a level title when the engine advances a topic.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::LadderError;
use crate::types::Topic;

pub const DEFAULT_BASE_LEVEL_TITLE: &str = "Getting started";

/// Seed entry for a topic, as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSeed {
    pub id: String,
    pub title: String,
}

impl TopicSeed {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}

/// The built-in catalog
pub fn default_seeds() -> Vec<TopicSeed> {
    vec![
        TopicSeed::new("pentesting", "Pentesting"),
        TopicSeed::new("computer-forensics", "Computer Forensics"),
        TopicSeed::new("cybersecurity", "Cybersecurity"),
        TopicSeed::new("social-engineering", "Social Engineering"),
        TopicSeed::new("malware-analysis", "Malware Analysis"),
    ]
}

/// Ordered catalog of topics
pub struct TopicRegistry {
    topics: RwLock<Vec<Topic>>,
}

impl TopicRegistry {
    /// Build the registry from seeds. Later seeds with an already used id are skipped.
    pub fn new(seeds: &[TopicSeed], base_level_title: &str) -> Self {
        let mut topics: Vec<Topic> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if topics.iter().any(|t| t.id == seed.id) {
                continue;
            }
            topics.push(Topic::new(&seed.id, &seed.title, base_level_title));
        }
        Self {
            topics: RwLock::new(topics),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&default_seeds(), DEFAULT_BASE_LEVEL_TITLE)
    }

    /// All topics in menu order
    pub async fn list_topics(&self) -> Vec<Topic> {
        self.topics.read().await.clone()
    }

    pub async fn get(&self, topic_id: &str) -> Result<Topic, LadderError> {
        self.topics
            .read()
            .await
            .iter()
            .find(|t| t.id == topic_id)
            .cloned()
            .ok_or_else(|| LadderError::UnknownTopic(topic_id.to_string()))
    }

    /// Look a topic up by id, case-insensitive title, or 1-based menu position
    pub async fn resolve(&self, query: &str) -> Result<Topic, LadderError> {
        let query = query.trim();
        let topics = self.topics.read().await;

        if let Some(topic) = topics.iter().find(|t| t.id == query) {
            return Ok(topic.clone());
        }
        if let Some(topic) = topics.iter().find(|t| t.title.eq_ignore_ascii_case(query)) {
            return Ok(topic.clone());
        }
        if let Ok(index) = query.parse::<usize>() {
            if index >= 1 {
                if let Some(topic) = topics.get(index - 1) {
                    return Ok(topic.clone());
                }
            }
        }
        Err(LadderError::UnknownTopic(query.to_string()))
    }

    /// Append one level title; returns the number of the new level
    pub async fn append_level(&self, topic_id: &str, title: &str) -> Result<u32, LadderError> {
        let mut topics = self.topics.write().await;
        let topic = topics
            .iter_mut()
            .find(|t| t.id == topic_id)
            .ok_or_else(|| LadderError::UnknownTopic(topic_id.to_string()))?;

        topic.levels.push(title.to_string());
        let level = topic.top_level();
        info!("Topic {} reached level {}: {}", topic_id, level, title);
        Ok(level)
    }

    /// Undo an `append_level` whose paired store update failed
    pub(crate) async fn retract_level(&self, topic_id: &str, level: u32) {
        let mut topics = self.topics.write().await;
        if let Some(topic) = topics.iter_mut().find(|t| t.id == topic_id) {
            if level > 0 && topic.top_level() == level {
                topic.levels.pop();
            }
        }
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
